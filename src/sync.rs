use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use crate::cli::SyncArgs;
use crate::config::SyncConfig;
use crate::dedup::{DedupChecker, canonical_url, sanitize_title};
use crate::formats::{ListEntry, WatchStatus};
use crate::notion::{Block, Destination, NewRecord, NotionClient};

pub const DEFAULT_STATUS: &str = "Plan to Watch";
pub const SYNOPSIS_HEADING: &str = "Synopsis";

/// Notion status option for a MyAnimeList list status.
pub fn status_label(status: Option<&WatchStatus>) -> &'static str {
    match status {
        Some(WatchStatus::Completed) => "Completed",
        Some(WatchStatus::PlanToWatch) => "Plan to Watch",
        Some(WatchStatus::OnHold) => "On Hold",
        Some(WatchStatus::Dropped) => "Dropped",
        Some(WatchStatus::Watching) => "Watching",
        Some(WatchStatus::Other(_)) | None => DEFAULT_STATUS,
    }
}

pub fn new_record(entry: &ListEntry, sanitized_title: &str) -> NewRecord {
    let anime = &entry.node;
    let picture = anime.main_picture.as_ref();
    NewRecord {
        url: canonical_url(anime.id, sanitized_title),
        title: anime.title.clone(),
        alternative_title: anime
            .alternative_titles
            .as_ref()
            .and_then(|alt| alt.en.clone())
            .filter(|en| !en.is_empty()),
        status: status_label(anime.my_list_status.as_ref().map(|s| &s.status)).to_owned(),
        genres: anime
            .genres
            .iter()
            .flatten()
            .map(|genre| genre.name.clone())
            .collect(),
        cover_url: picture.and_then(|p| p.large.clone()),
        icon_url: picture.and_then(|p| p.medium.clone()),
    }
}

pub fn synopsis_blocks(synopsis: &str) -> Vec<Block> {
    vec![
        Block::Heading2(SYNOPSIS_HEADING.to_owned()),
        Block::Paragraph(synopsis.to_owned()),
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum EntryOutcome {
    Created,
    Skipped,
}

/// Materializes snapshot entries in the destination database.
#[derive(Clone)]
pub struct SyncEngine {
    destination: Arc<dyn Destination>,
    dedup: DedupChecker,
    concurrency: Option<usize>,
}

impl SyncEngine {
    /// `concurrency: None` runs every entry at once.
    pub fn new(destination: Arc<dyn Destination>, concurrency: Option<usize>) -> Self {
        Self {
            dedup: DedupChecker::new(Arc::clone(&destination)),
            destination,
            concurrency,
        }
    }

    /// Syncs every entry independently and waits for all of them. A failing
    /// entry is logged and never affects the others.
    pub async fn run(&self, entries: Vec<ListEntry>) -> SyncSummary {
        let total = entries.len();
        let limit = self.concurrency.unwrap_or(total).max(1);
        tracing::info!(entries = total, concurrency = limit, "sync: start");

        let mut summary = SyncSummary::default();
        let mut pending = entries.into_iter();
        let mut join_set = tokio::task::JoinSet::new();

        loop {
            while join_set.len() < limit {
                let Some(entry) = pending.next() else {
                    break;
                };
                let engine = self.clone();
                join_set.spawn(async move {
                    let title = entry.node.title.clone();
                    let result = engine.sync_entry(&entry).await;
                    (title, result)
                });
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };
            match joined {
                Ok((_, Ok(EntryOutcome::Created))) => summary.created += 1,
                Ok((_, Ok(EntryOutcome::Skipped))) => summary.skipped += 1,
                Ok((title, Err(err))) => {
                    summary.failed += 1;
                    tracing::error!(title = %title, error = %format!("{err:#}"), "error adding anime entry");
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::error!(?err, "sync task panicked");
                }
            }
        }

        tracing::info!(
            created = summary.created,
            skipped = summary.skipped,
            failed = summary.failed,
            "sync: done"
        );
        summary
    }

    async fn sync_entry(&self, entry: &ListEntry) -> anyhow::Result<EntryOutcome> {
        let anime = &entry.node;
        let sanitized = sanitize_title(&anime.title);

        if self.dedup.exists(anime.id, &sanitized).await {
            tracing::debug!(id = anime.id, title = %anime.title, "skipping existing entry");
            return Ok(EntryOutcome::Skipped);
        }

        let record = new_record(entry, &sanitized);
        let record_id = self
            .destination
            .create_record(&record)
            .await
            .context("create record")?;
        tracing::info!(id = anime.id, title = %anime.title, record_id = %record_id, "added");

        self.destination
            .append_blocks(&record_id, &synopsis_blocks(&anime.synopsis))
            .await
            .with_context(|| format!("append synopsis to record {record_id}"))?;
        tracing::info!(id = anime.id, title = %anime.title, "added synopsis");

        Ok(EntryOutcome::Created)
    }
}

pub async fn run(args: SyncArgs) -> anyhow::Result<()> {
    let env_path = PathBuf::from(&args.env_file);
    let env = crate::config::load_env(&env_path)?;
    let config = SyncConfig::resolve(&env).context("resolve sync config")?;
    tracing::debug!(?config, "resolved sync config");

    if args.concurrency == Some(0) {
        anyhow::bail!("--concurrency must be > 0");
    }

    let snapshot_path = crate::snapshot::snapshot_path(&PathBuf::from(&args.data_dir));
    let entries = crate::snapshot::read(&snapshot_path)
        .await
        .context("load snapshot")?;

    let client = reqwest::Client::builder()
        .build()
        .context("build http client")?;
    let destination = NotionClient::new(
        client,
        &args.notion_api_url,
        config.notion_api_key,
        config.database_id,
    );

    let summary = SyncEngine::new(Arc::new(destination), args.concurrency)
        .run(entries)
        .await;
    if summary.failed > 0 {
        tracing::warn!(
            failed = summary.failed,
            "some entries failed to sync; see errors above"
        );
    }

    Ok(())
}
