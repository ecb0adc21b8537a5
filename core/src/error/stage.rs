use std::fmt;

use thiserror::Error;

use crate::stage::Stage;

/// Network-level failure class, mirrored from what the HTTP client reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Unknown,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a remote stage client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("Missing API Key for {0} node.")]
    MissingCredential(Stage),

    #[error("Missing Base URL for {0} node.")]
    MissingEndpoint(Stage),

    #[error("{} ({}): {}", .stage.error_label(), .code, .body)]
    Status {
        stage: Stage,
        code: u16,
        body: String,
    },

    #[error("{kind} error: {message}")]
    Transport {
        kind: TransportKind,
        message: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("No image URL returned from provider.")]
    NoImage,
}

impl StageError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_node() {
        assert_eq!(
            StageError::MissingCredential(Stage::Analysis).to_string(),
            "Missing API Key for analysis node."
        );
        assert_eq!(
            StageError::MissingEndpoint(Stage::Generation).to_string(),
            "Missing Base URL for generation node."
        );
    }

    #[test]
    fn status_message_uses_stage_label() {
        let err = StageError::Status {
            stage: Stage::Analysis,
            code: 401,
            body: "invalid key".to_string(),
        };
        assert_eq!(err.to_string(), "Vision API Error (401): invalid key");

        let err = StageError::Status {
            stage: Stage::Generation,
            code: 500,
            body: "<empty body>".to_string(),
        };
        assert_eq!(err.to_string(), "Image Gen Error (500): <empty body>");
    }

    #[test]
    fn transport_classification() {
        let err = StageError::Transport {
            kind: TransportKind::Timeout,
            message: "operation timed out".to_string(),
        };
        assert!(err.is_transport());
        assert!(!StageError::NoImage.is_transport());
    }
}
