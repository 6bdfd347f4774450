//! The query workflow: state, validation and the controller that runs it.

pub mod controller;
pub mod state;
pub mod validator;

#[allow(unused_imports)]
pub use controller::{
    finalize, Terminal, Workflow, WorkflowOutcome, CANCELLED_MESSAGE, FAILURE_MESSAGE,
};
#[allow(unused_imports)]
pub use state::{GatekeeperDecision, ResponderKind, Validation, WorkflowState};
pub use validator::Validator;

/// Why a run could not reach a terminal state on its own.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Gatekeeper failed: {0:#}")]
    Gatekeeper(anyhow::Error),

    #[error("Query classification failed: {0:#}")]
    Classifier(anyhow::Error),

    #[error("Responder failed: {0:#}")]
    Responder(anyhow::Error),

    #[error("Validation failed: {0:#}")]
    Validator(anyhow::Error),

    #[error("Workflow cancelled")]
    Cancelled,

    #[error("Workflow exceeded {0} steps")]
    StepLimit(u32),
}

impl WorkflowError {
    /// Short stage name for logs and API responses.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Gatekeeper(_) => "gatekeeper",
            Self::Classifier(_) => "classifier",
            Self::Responder(_) => "responder",
            Self::Validator(_) => "validator",
            Self::Cancelled => "cancelled",
            Self::StepLimit(_) => "step_limit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_includes_cause_chain() {
        let cause = anyhow::anyhow!("connection reset").context("Gemini API error");
        let err = WorkflowError::Responder(cause);
        let text = err.to_string();
        assert!(text.starts_with("Responder failed"));
        assert!(text.contains("connection reset"));
        assert_eq!(err.stage(), "responder");
    }
}
