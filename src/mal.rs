use anyhow::Context as _;
use url::Url;

use crate::formats::{ListEntry, ListPage};

const SERVICE: &str = "MyAnimeList";

/// Fields requested for every list entry.
pub const LIST_FIELDS: &str =
    "id,title,main_picture,alternative_titles,synopsis,genres,my_list_status";

pub fn list_endpoint(api_base_url: &str) -> String {
    let base_url = api_base_url.trim_end_matches('/');
    format!("{base_url}/users/@me/animelist")
}

/// Retrieves the authenticated user's complete anime list.
#[derive(Debug, Clone)]
pub struct ListFetcher {
    client: reqwest::Client,
    list_endpoint: String,
}

impl ListFetcher {
    pub fn new(client: reqwest::Client, api_base_url: &str) -> Self {
        Self {
            client,
            list_endpoint: list_endpoint(api_base_url),
        }
    }

    pub fn first_page_url(&self) -> anyhow::Result<Url> {
        Url::parse_with_params(
            &self.list_endpoint,
            &[("nsfw", "true"), ("fields", LIST_FIELDS)],
        )
        .with_context(|| format!("build list url from {}", self.list_endpoint))
    }

    /// Follows `paging.next` one page at a time until the cursor runs out.
    /// Any failed page aborts the whole fetch.
    pub async fn fetch_all(&self, access_token: &str) -> anyhow::Result<Vec<ListEntry>> {
        let mut entries = Vec::new();
        let mut next_url = Some(self.first_page_url()?.to_string());
        let mut page_index = 0usize;

        while let Some(url) = next_url.take() {
            let page = self
                .fetch_page(&url, access_token)
                .await
                .with_context(|| format!("fetch list page {page_index}: GET {url}"))?;
            tracing::debug!(
                page = page_index,
                entries = page.data.len(),
                has_next = page.next_url().is_some(),
                "fetched list page"
            );

            next_url = page.next_url().map(str::to_owned);
            entries.extend(page.data);
            page_index += 1;
        }

        tracing::info!(pages = page_index, entries = entries.len(), "fetched anime list");
        Ok(entries)
    }

    async fn fetch_page(&self, url: &str, access_token: &str) -> anyhow::Result<ListPage> {
        let request = self.client.get(url).bearer_auth(access_token);
        let page = crate::http::send_json(SERVICE, request).await?;
        Ok(page)
    }
}
