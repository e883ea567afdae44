use serde::de::DeserializeOwned;

/// Failure talking to a remote API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} API error ({status}): {detail}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
        detail: String,
    },
    #[error("{service} returned an unexpected response body: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Sends `request` and decodes a successful JSON body into `T`.
///
/// Non-2xx responses become [`ApiError::Status`] carrying the API's own error
/// message when the body has one, otherwise the raw body.
pub async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, ApiError> {
    let raw = send_raw(service, request).await?;
    serde_json::from_str(&raw).map_err(|source| ApiError::Decode { service, source })
}

/// Like [`send_json`] but ignores the body of a successful response.
pub async fn send_unit(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<(), ApiError> {
    send_raw(service, request).await.map(|_| ())
}

async fn send_raw(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<String, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|source| ApiError::Transport { service, source })?;

    let status = response.status();
    let raw = response
        .text()
        .await
        .map_err(|source| ApiError::Transport { service, source })?;
    if !status.is_success() {
        let detail = parse_error_message(&raw).unwrap_or_else(|| {
            if raw.trim().is_empty() {
                status.canonical_reason().unwrap_or("no response body").to_owned()
            } else {
                raw.clone()
            }
        });
        return Err(ApiError::Status {
            service,
            status,
            detail,
        });
    }
    Ok(raw)
}

// MyAnimeList uses {"error", "message"}; Notion uses {"code", "message"}.
fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let code = value
        .get("error")
        .or_else(|| value.get("code"))
        .and_then(|v| v.as_str());
    let message = value
        .get("message")
        .or_else(|| value.get("error_description"))
        .and_then(|v| v.as_str());

    match (code, message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_owned()),
        (None, None) => None,
    }
}
