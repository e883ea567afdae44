use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct NotionStubConfig {
    pub api_key: String,
    pub database_id: String,
    /// URLs of pages already present in the database.
    pub existing_urls: Vec<String>,
    /// Page titles whose creation is rejected.
    pub reject_titles: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct NotionStubLog {
    pub queries: Vec<Value>,
    pub created_pages: Vec<Value>,
    pub appended: Vec<(String, Value)>,
}

pub struct NotionStub {
    pub base_url: String,
    log: Arc<Mutex<NotionStubLog>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl NotionStub {
    pub fn spawn(config: NotionStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start notion stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");
        let log = Arc::new(Mutex::new(NotionStubLog::default()));

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let thread_log = Arc::clone(&log);

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let (status, body) = if !authorized(&request, &config.api_key) {
                    (401, error_body("unauthorized", "API token is invalid."))
                } else {
                    let mut raw = String::new();
                    let _ = request.as_reader().read_to_string(&mut raw);
                    let parsed = serde_json::from_str::<Value>(&raw).unwrap_or(Value::Null);
                    let path = request.url().to_string();
                    let mut log = thread_log.lock().expect("lock stub log");
                    route(&config, &mut log, request.method(), &path, parsed)
                };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(body.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            log,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn log(&self) -> NotionStubLog {
        self.log.lock().expect("lock stub log").clone()
    }
}

impl Drop for NotionStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn header(request: &tiny_http::Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_owned())
}

fn authorized(request: &tiny_http::Request, api_key: &str) -> bool {
    header(request, "Authorization").as_deref() == Some(format!("Bearer {api_key}").as_str())
        && header(request, "Notion-Version").is_some()
}

fn error_body(code: &str, message: &str) -> Value {
    serde_json::json!({ "object": "error", "code": code, "message": message })
}

fn route(
    config: &NotionStubConfig,
    log: &mut NotionStubLog,
    method: &tiny_http::Method,
    path: &str,
    body: Value,
) -> (u16, Value) {
    let query_path = format!("/v1/databases/{}/query", config.database_id);

    if method == &tiny_http::Method::Post && path == query_path {
        let needle = body
            .pointer("/filter/url/contains")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned();
        log.queries.push(body);
        let results = config
            .existing_urls
            .iter()
            .filter(|url| url.contains(&needle))
            .map(|url| serde_json::json!({ "object": "page", "id": format!("existing-{url}") }))
            .collect::<Vec<_>>();
        return (200, serde_json::json!({ "object": "list", "results": results }));
    }

    if method == &tiny_http::Method::Post && path == "/v1/pages" {
        let title = body
            .pointer("/properties/Name/title/0/text/content")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if config.reject_titles.iter().any(|t| t == title) {
            return (400, error_body("validation_error", "rejected by stub"));
        }
        log.created_pages.push(body);
        let id = format!("page-{}", log.created_pages.len());
        return (200, serde_json::json!({ "object": "page", "id": id }));
    }

    if method == &tiny_http::Method::Patch
        && let Some(rest) = path.strip_prefix("/v1/blocks/")
        && let Some(page_id) = rest.strip_suffix("/children")
    {
        log.appended.push((page_id.to_owned(), body));
        return (200, serde_json::json!({ "object": "list", "results": [] }));
    }

    (404, error_body("object_not_found", "no such route"))
}
