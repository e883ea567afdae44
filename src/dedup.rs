use std::sync::Arc;

use crate::notion::{Destination, URL_PROPERTY};

pub const ANIME_URL_BASE: &str = "https://myanimelist.net/anime";

/// Lower-cased title where every run of non-alphanumeric characters is a single `-`.
pub fn sanitize_title(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug
}

/// URL stored on each destination record and used as its dedup key.
pub fn canonical_url(id: u64, sanitized_title: &str) -> String {
    format!("{ANIME_URL_BASE}/{id}/{sanitized_title}")
}

/// Asks the destination whether an entry was already synced.
///
/// Check-then-create is not atomic: two runs racing on the same entry can
/// both see "absent" and both create a record.
#[derive(Clone)]
pub struct DedupChecker {
    destination: Arc<dyn Destination>,
}

impl DedupChecker {
    pub fn new(destination: Arc<dyn Destination>) -> Self {
        Self { destination }
    }

    /// Query failures count as "not found", so a flaky query may produce a
    /// duplicate record but never drops an entry.
    pub async fn exists(&self, id: u64, sanitized_title: &str) -> bool {
        let url = canonical_url(id, sanitized_title);
        match self.destination.query_url_contains(URL_PROPERTY, &url).await {
            Ok(matches) => !matches.is_empty(),
            Err(err) => {
                tracing::warn!(id, url = %url, error = %format!("{err:#}"), "dedup query failed; treating entry as new");
                false
            }
        }
    }
}
