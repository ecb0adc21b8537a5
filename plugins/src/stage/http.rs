//! Shared HTTP plumbing for the stage clients.

use std::time::Duration;

use uniflow_core::api::{Stage, StageConfig, StageError, TransportKind};

const BODY_PREVIEW_LIMIT: usize = 512;

pub fn build_client(timeout_ms: u64) -> anyhow::Result<reqwest::Client> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()?;
    Ok(http)
}

pub(crate) fn transport_error(err: reqwest::Error) -> StageError {
    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else if err.is_connect() {
        TransportKind::Connect
    } else if err.is_request() {
        TransportKind::Request
    } else if err.is_body() {
        TransportKind::Body
    } else if err.is_decode() {
        TransportKind::Decode
    } else {
        TransportKind::Unknown
    };
    StageError::Transport {
        kind,
        message: err.to_string(),
    }
}

pub(crate) fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out = String::new();
    let mut truncated = false;
    for (idx, ch) in trimmed.chars().enumerate() {
        if idx >= BODY_PREVIEW_LIMIT {
            truncated = true;
            break;
        }
        out.push(ch);
    }

    if truncated {
        out.push_str("...");
    }

    out
}

/// Credential and endpoint checks done before any request is built.
/// Returns the trimmed key and the normalized base URL.
pub(crate) fn require_endpoint(
    stage: Stage,
    config: &StageConfig,
) -> Result<(String, String), StageError> {
    if !config.has_credential() {
        return Err(StageError::MissingCredential(stage));
    }
    if !config.has_endpoint() {
        return Err(StageError::MissingEndpoint(stage));
    }
    Ok((
        config.api_key.trim().to_string(),
        config.normalized_base_url().to_string(),
    ))
}

/// Read the body of a non-2xx response into a status error.
pub(crate) async fn status_error(stage: Stage, resp: reqwest::Response) -> StageError {
    let code = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StageError::Status {
        stage,
        code,
        body: preview_body(&body),
    }
}
