use std::path::PathBuf;

use anyhow::Context as _;

use crate::auth::TokenStore;
use crate::cli::FetchArgs;
use crate::config::FetchConfig;
use crate::mal::ListFetcher;

/// Refreshes the access token when needed, fetches the whole list and
/// overwrites the snapshot. Nothing is written if any page fails.
pub async fn run(args: FetchArgs) -> anyhow::Result<()> {
    let env_path = PathBuf::from(&args.env_file);
    let env = crate::config::load_env(&env_path)?;
    let config = FetchConfig::resolve(&env).context("resolve fetch config")?;
    tracing::debug!(credentials = ?config.credentials, "resolved fetch config");

    let client = reqwest::Client::builder()
        .build()
        .context("build http client")?;

    let mut tokens = TokenStore::new(
        client.clone(),
        crate::auth::token_endpoint(&args.mal_auth_url),
        env_path,
        config.credentials,
    );
    if tokens.access_token().is_none() {
        tracing::info!("no access token found; refreshing");
        tokens.refresh().await.context("refresh access token")?;
    }
    let access_token = tokens
        .access_token()
        .ok_or_else(|| anyhow::anyhow!("unable to obtain an access token; re-authenticate"))?
        .to_owned();

    let fetcher = ListFetcher::new(client, &args.mal_api_url);
    let entries = fetcher
        .fetch_all(&access_token)
        .await
        .context("fetch anime list")?;

    let snapshot_path = crate::snapshot::snapshot_path(&PathBuf::from(&args.data_dir));
    crate::snapshot::write(&snapshot_path, &entries)
        .await
        .context("save snapshot")?;
    tracing::info!(
        count = entries.len(),
        path = %snapshot_path.display(),
        "retrieved anime list"
    );

    Ok(())
}
