use std::path::Path;

use anyhow::Context as _;

use crate::auth::Credentials;
use crate::env_file::{self, EnvFile};

/// Settings required by the `fetch` stage.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub credentials: Credentials,
}

/// Settings required by the `sync` stage.
#[derive(Clone)]
pub struct SyncConfig {
    pub notion_api_key: String,
    pub database_id: String,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("notion_api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .finish()
    }
}

impl FetchConfig {
    /// `ACCESS_TOKEN` is optional: when absent the token is refreshed first.
    pub fn resolve(env: &EnvFile) -> anyhow::Result<Self> {
        require(env, &[env_file::MAL_CLIENT_ID, env_file::REFRESH_TOKEN])?;
        let credentials = Credentials {
            client_id: env.get(env_file::MAL_CLIENT_ID).map(str::to_owned),
            access_token: env.get(env_file::ACCESS_TOKEN).map(str::to_owned),
            refresh_token: env.get(env_file::REFRESH_TOKEN).map(str::to_owned),
        };
        Ok(Self { credentials })
    }
}

impl SyncConfig {
    pub fn resolve(env: &EnvFile) -> anyhow::Result<Self> {
        require(env, &[env_file::NOTION_API_KEY, env_file::DATABASE_ID])?;
        Ok(Self {
            notion_api_key: env
                .get(env_file::NOTION_API_KEY)
                .map(str::to_owned)
                .unwrap_or_default(),
            database_id: env
                .get(env_file::DATABASE_ID)
                .map(str::to_owned)
                .unwrap_or_default(),
        })
    }
}

/// Loads `path` and overlays the process environment on top of it.
pub fn load_env(path: &Path) -> anyhow::Result<EnvFile> {
    let env = EnvFile::load(path).context("load env file")?;
    Ok(env.overlay(std::env::vars()))
}

fn require(env: &EnvFile, keys: &[&str]) -> anyhow::Result<()> {
    let missing = keys
        .iter()
        .copied()
        .filter(|key| env.get(key).is_none())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        anyhow::bail!(
            "missing required environment variables: {}",
            missing.join(", ")
        );
    }
    Ok(())
}
