//! Work item transition rules

use super::types::WorkflowStatus;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },
    #[error("Cannot retry an item in state {state:?}; only failed items can be retried")]
    NotRetryable { state: WorkflowStatus },
}

pub struct StateTransition;

impl StateTransition {
    /// Check a status change against the lifecycle table. Removal is not a
    /// transition and is always allowed.
    pub fn validate(from: WorkflowStatus, to: WorkflowStatus) -> Result<(), TransitionError> {
        let is_valid = matches!(
            (from, to),
            (WorkflowStatus::Pending, WorkflowStatus::Analyzing)
                | (WorkflowStatus::Analyzing, WorkflowStatus::Generating)
                | (WorkflowStatus::Analyzing, WorkflowStatus::Error)
                | (WorkflowStatus::Generating, WorkflowStatus::Completed)
                | (WorkflowStatus::Generating, WorkflowStatus::Error)
                | (WorkflowStatus::Error, WorkflowStatus::Pending)
        );

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    pub fn validate_retry(from: WorkflowStatus) -> Result<(), TransitionError> {
        if from == WorkflowStatus::Error {
            Ok(())
        } else {
            Err(TransitionError::NotRetryable { state: from })
        }
    }

    /// Stable absent user action.
    pub fn is_terminal(status: WorkflowStatus) -> bool {
        matches!(status, WorkflowStatus::Completed | WorkflowStatus::Error)
    }

    pub fn status_description(status: WorkflowStatus) -> &'static str {
        match status {
            WorkflowStatus::Pending => "Queued",
            WorkflowStatus::Analyzing => "Reverse prompting",
            WorkflowStatus::Generating => "Generating image",
            WorkflowStatus::Completed => "Completed",
            WorkflowStatus::Error => "Failed",
        }
    }
}
