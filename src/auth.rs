use std::path::PathBuf;

use anyhow::Context as _;
use serde::Deserialize;

use crate::env_file;

const SERVICE: &str = "MyAnimeList OAuth";

pub fn token_endpoint(auth_base_url: &str) -> String {
    let base_url = auth_base_url.trim_end_matches('/');
    format!("{base_url}/token")
}

/// MyAnimeList OAuth credentials. Replaced as a whole on refresh.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Owns the current credentials and the file they are persisted to.
pub struct TokenStore {
    client: reqwest::Client,
    token_endpoint: String,
    config_path: PathBuf,
    credentials: Credentials,
}

impl TokenStore {
    pub fn new(
        client: reqwest::Client,
        token_endpoint: impl Into<String>,
        config_path: impl Into<PathBuf>,
        credentials: Credentials,
    ) -> Self {
        Self {
            client,
            token_endpoint: token_endpoint.into(),
            config_path: config_path.into(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn access_token(&self) -> Option<&str> {
        non_empty(&self.credentials.access_token)
    }

    /// Exchanges the refresh token for a new token pair, writes both tokens to
    /// the config file, then swaps the in-memory credentials.
    ///
    /// On failure the current credentials are left untouched.
    pub async fn refresh(&mut self) -> anyhow::Result<&Credentials> {
        let (Some(client_id), Some(refresh_token)) = (
            non_empty(&self.credentials.client_id),
            non_empty(&self.credentials.refresh_token),
        ) else {
            anyhow::bail!(
                "cannot refresh access token: {} or {} is missing",
                env_file::MAL_CLIENT_ID,
                env_file::REFRESH_TOKEN
            );
        };

        let form = [
            ("client_id", client_id),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let request = self.client.post(&self.token_endpoint).form(&form);
        let response: TokenResponse = crate::http::send_json(SERVICE, request)
            .await
            .with_context(|| format!("POST {}", self.token_endpoint))?;
        tracing::debug!(
            token_type = response.token_type.as_deref().unwrap_or("unknown"),
            expires_in = response.expires_in.unwrap_or_default(),
            "received refreshed token"
        );

        env_file::replace_keys(
            &self.config_path,
            &[
                (env_file::ACCESS_TOKEN, response.access_token.as_str()),
                (env_file::REFRESH_TOKEN, response.refresh_token.as_str()),
            ],
        )
        .await
        .context("persist refreshed tokens")?;

        self.credentials = Credentials {
            client_id: self.credentials.client_id.clone(),
            access_token: Some(response.access_token),
            refresh_token: Some(response.refresh_token),
        };
        tracing::info!(path = %self.config_path.display(), "refreshed access token");
        Ok(&self.credentials)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
