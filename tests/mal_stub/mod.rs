use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct MalStubConfig {
    /// Token pair handed out by the token endpoint. `None` makes it answer 400.
    pub issued_tokens: Option<(String, String)>,
    /// Bearer token the list endpoint accepts.
    pub accepted_access_token: String,
    /// Entries per page; the last page carries no `paging.next`.
    pub pages: Vec<Vec<Value>>,
    /// Zero-based page index answered with a 500.
    pub fail_page: Option<usize>,
}

#[derive(Debug, Default, Clone)]
pub struct MalStubLog {
    pub token_requests: Vec<String>,
    pub list_requests: Vec<String>,
}

pub struct MalStub {
    pub auth_url: String,
    pub api_url: String,
    pub log: Arc<Mutex<MalStubLog>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
pub fn anime_json(id: u64, title: &str) -> Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "main_picture": {
            "medium": format!("https://cdn.example/{id}m.jpg"),
            "large": format!("https://cdn.example/{id}l.jpg"),
        },
        "alternative_titles": { "synonyms": [], "en": "", "ja": "" },
        "synopsis": format!("About {title}."),
        "my_list_status": {
            "status": "watching",
            "score": 0,
            "num_episodes_watched": 1,
            "is_rewatching": false,
            "updated_at": "2024-05-01T10:00:00+00:00",
        },
    })
}

impl MalStub {
    pub fn spawn(config: MalStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start mal stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");
        let log = Arc::new(Mutex::new(MalStubLog::default()));

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let thread_log = Arc::clone(&log);
        let thread_base_url = base_url.clone();

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

                let url = request.url().to_string();
                let path = url.split('?').next().unwrap_or(&url).to_owned();

                let (status, body) = if request.method() == &tiny_http::Method::Post
                    && path == "/v1/oauth2/token"
                {
                    let mut form = String::new();
                    let _ = request.as_reader().read_to_string(&mut form);
                    thread_log
                        .lock()
                        .expect("lock stub log")
                        .token_requests
                        .push(form);
                    match &config.issued_tokens {
                        Some((access, refresh)) => (
                            200,
                            serde_json::json!({
                                "token_type": "Bearer",
                                "expires_in": 2678400,
                                "access_token": access,
                                "refresh_token": refresh,
                            }),
                        ),
                        None => (
                            400,
                            serde_json::json!({
                                "error": "invalid_grant",
                                "message": "The refresh token is invalid.",
                            }),
                        ),
                    }
                } else if request.method() == &tiny_http::Method::Get
                    && path == "/v2/users/@me/animelist"
                {
                    thread_log
                        .lock()
                        .expect("lock stub log")
                        .list_requests
                        .push(url.clone());
                    list_response(&config, &thread_base_url, &url, bearer(&request))
                } else {
                    (404, serde_json::json!({ "error": "not_found" }))
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
            auth_url: format!("{base_url}/v1/oauth2"),
            api_url: format!("{base_url}/v2"),
            log,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn log(&self) -> MalStubLog {
        self.log.lock().expect("lock stub log").clone()
    }
}

impl Drop for MalStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn bearer(request: &tiny_http::Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str().to_owned())
}

fn list_response(
    config: &MalStubConfig,
    base_url: &str,
    url: &str,
    authorization: Option<String>,
) -> (u16, Value) {
    let expected = format!("Bearer {}", config.accepted_access_token);
    if authorization.as_deref() != Some(expected.as_str()) {
        return (401, serde_json::json!({ "error": "invalid_token" }));
    }

    let parsed = match url::Url::parse(&format!("{base_url}{url}")) {
        Ok(parsed) => parsed,
        Err(_) => return (400, serde_json::json!({ "error": "bad_request" })),
    };
    let page_index = parsed
        .query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    if config.fail_page == Some(page_index) {
        return (500, serde_json::json!({ "error": "internal_error" }));
    }
    let Some(entries) = config.pages.get(page_index) else {
        return (404, serde_json::json!({ "error": "not_found" }));
    };

    let data = entries
        .iter()
        .map(|node| serde_json::json!({ "node": node }))
        .collect::<Vec<_>>();
    let paging = if page_index + 1 < config.pages.len() {
        serde_json::json!({
            "next": format!("{base_url}/v2/users/@me/animelist?nsfw=true&page={}", page_index + 1),
        })
    } else {
        serde_json::json!({})
    };

    (200, serde_json::json!({ "data": data, "paging": paging }))
}
