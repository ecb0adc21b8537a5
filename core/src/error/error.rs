use thiserror::Error;

use super::stage::StageError;
use crate::stage::Stage;
use crate::state::{ItemId, TransitionError};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("configuration missing for {stage} stage: base URL and API key are required")]
    ConfigurationMissing { stage: Stage },

    #[error("{stage} stage failed: {message}")]
    StageFailure { stage: Stage, message: String },

    #[error("{stage} transport failed: {message}")]
    Transport { stage: Stage, message: String },

    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("work item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// Classify a stage client error. Transport and stage failures are handled
    /// the same way by the scheduler; only the variant differs.
    pub fn from_stage(stage: Stage, err: StageError) -> Self {
        if err.is_transport() {
            Self::Transport {
                stage,
                message: err.to_string(),
            }
        } else {
            Self::StageFailure {
                stage,
                message: err.to_string(),
            }
        }
    }

    /// Message recorded on a failed work item.
    pub fn item_message(&self) -> String {
        match self {
            Self::StageFailure { message, .. } | Self::Transport { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportKind;

    #[test]
    fn from_stage_splits_transport() {
        let err = BatchError::from_stage(
            Stage::Generation,
            StageError::Transport {
                kind: TransportKind::Connect,
                message: "connection refused".into(),
            },
        );
        assert!(matches!(err, BatchError::Transport { .. }));
        assert_eq!(err.item_message(), "connect error: connection refused");

        let err = BatchError::from_stage(Stage::Generation, StageError::NoImage);
        assert!(matches!(err, BatchError::StageFailure { .. }));
        assert_eq!(err.item_message(), "No image URL returned from provider.");
    }
}
