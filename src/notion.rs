use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

const SERVICE: &str = "Notion";
pub const NOTION_VERSION: &str = "2022-06-28";

pub const URL_PROPERTY: &str = "URL";
pub const NAME_PROPERTY: &str = "Name";
pub const ALTERNATIVE_NAME_PROPERTY: &str = "Alternative Name";
pub const STATUS_PROPERTY: &str = "Status";
pub const GENRE_PROPERTY: &str = "Genre";

/// Longest `text.content` Notion accepts in a single rich-text object.
pub const MAX_TEXT_CHARS: usize = 2000;

/// A page to create in the destination database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub url: String,
    pub title: String,
    pub alternative_title: Option<String>,
    pub status: String,
    pub genres: Vec<String>,
    pub cover_url: Option<String>,
    pub icon_url: Option<String>,
}

/// Content block appended to a created page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading2(String),
    Paragraph(String),
}

/// The destination database: query by URL, create a record, append content.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Ids of records whose `property` URL contains `needle`.
    async fn query_url_contains(&self, property: &str, needle: &str)
    -> anyhow::Result<Vec<String>>;
    /// Creates a record and returns its id.
    async fn create_record(&self, record: &NewRecord) -> anyhow::Result<String>;
    async fn append_blocks(&self, record_id: &str, blocks: &[Block]) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    database_id: String,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("database_id", &self.database_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
struct PageRef {
    id: String,
}

impl NotionClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            database_id: database_id.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }
}

#[async_trait]
impl Destination for NotionClient {
    async fn query_url_contains(
        &self,
        property: &str,
        needle: &str,
    ) -> anyhow::Result<Vec<String>> {
        let path = format!("/databases/{}/query", self.database_id);
        let body = json!({
            "filter": {
                "property": property,
                "url": { "contains": needle },
            },
        });
        let response: QueryResponse =
            crate::http::send_json(SERVICE, self.request(reqwest::Method::POST, &path).json(&body))
                .await
                .with_context(|| format!("POST {path}"))?;
        Ok(response.results.into_iter().map(|page| page.id).collect())
    }

    async fn create_record(&self, record: &NewRecord) -> anyhow::Result<String> {
        let body = page_body(&self.database_id, record);
        let page: PageRef =
            crate::http::send_json(SERVICE, self.request(reqwest::Method::POST, "/pages").json(&body))
                .await
                .context("POST /pages")?;
        Ok(page.id)
    }

    async fn append_blocks(&self, record_id: &str, blocks: &[Block]) -> anyhow::Result<()> {
        let path = format!("/blocks/{record_id}/children");
        let body = json!({
            "children": blocks.iter().map(block_json).collect::<Vec<_>>(),
        });
        crate::http::send_unit(SERVICE, self.request(reqwest::Method::PATCH, &path).json(&body))
            .await
            .with_context(|| format!("PATCH {path}"))?;
        Ok(())
    }
}

/// Rich-text array for `content`, split into as many text objects as the
/// length limit requires.
fn rich_text(content: &str) -> Value {
    text_segments(content, MAX_TEXT_CHARS)
        .into_iter()
        .map(|segment| json!({ "type": "text", "text": { "content": segment } }))
        .collect()
}

fn text_segments(content: &str, max_chars: usize) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut rest = content;
    while let Some((split, _)) = rest.char_indices().nth(max_chars) {
        let (head, tail) = rest.split_at(split);
        segments.push(head);
        rest = tail;
    }
    segments.push(rest);
    segments
}

fn external_file(url: &str) -> Value {
    json!({ "type": "external", "external": { "url": url } })
}

fn page_body(database_id: &str, record: &NewRecord) -> Value {
    let alternative_name = match record.alternative_title.as_deref() {
        Some(title) => rich_text(title),
        None => json!([]),
    };
    let genres = record
        .genres
        .iter()
        .map(|name| json!({ "name": name }))
        .collect::<Vec<_>>();

    let mut body = json!({
        "parent": { "database_id": database_id },
        "properties": {
            URL_PROPERTY: { "url": record.url },
            NAME_PROPERTY: { "title": rich_text(&record.title) },
            ALTERNATIVE_NAME_PROPERTY: { "rich_text": alternative_name },
            STATUS_PROPERTY: { "status": { "name": record.status } },
            GENRE_PROPERTY: { "multi_select": genres },
        },
    });
    if let Some(obj) = body.as_object_mut() {
        if let Some(cover) = record.cover_url.as_deref() {
            obj.insert("cover".to_owned(), external_file(cover));
        }
        if let Some(icon) = record.icon_url.as_deref() {
            obj.insert("icon".to_owned(), external_file(icon));
        }
    }
    body
}

fn block_json(block: &Block) -> Value {
    match block {
        Block::Heading2(text) => json!({
            "object": "block",
            "type": "heading_2",
            "heading_2": { "rich_text": rich_text(text) },
        }),
        Block::Paragraph(text) => json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": { "rich_text": rich_text(text) },
        }),
    }
}
