//! Query supervisor: admits legal, clearly worded queries and enforces the
//! workflow's retry budget.

use serde::{Deserialize, Serialize};

use crate::providers::LanguageModel;
use crate::workflow::state::WorkflowState;

/// Returned for queries that are not about law.
pub const NON_LEGAL_MESSAGE: &str = "⚠️ We can assist with legal queries only. \
     Please reframe your question to focus on legal topics such as law, court procedures, or the constitution.";

/// Returned for legal queries too vague to act on.
pub const AMBIGUOUS_MESSAGE: &str = "⚠️ Your query seems unclear or ambiguous. \
     Please rephrase it more clearly, focusing on specific legal issues.";

/// Returned once the retry budget is spent.
pub const RETRY_LIMIT_MESSAGE: &str = "⚠️ Your query could not be validated after multiple attempts. \
     Please rephrase and try again later.";

/// Structured verdict from the pre-validation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAssessment {
    pub is_legal: bool,
    pub is_clear: bool,
    #[serde(default)]
    pub reason: String,
}

pub struct Gatekeeper {
    model: LanguageModel,
    max_retries: u32,
}

impl Gatekeeper {
    pub fn new(model: LanguageModel, max_retries: u32) -> Self {
        Self { model, max_retries }
    }

    fn build_prompt(query: &str) -> String {
        format!(
            r#"You are a legal query validator. Evaluate the user's query to determine:

1. Is it clearly about a legal topic (law, constitution, court case, FIR, etc.)?
2. Is it clearly worded, unambiguous, and actionable?

Respond ONLY in JSON format like:
{{
  "is_legal": true or false,
  "is_clear": true or false,
  "reason": "<Short justification>"
}}

Query:
{query}"#
        )
    }

    /// Run one gatekeeper pass.
    ///
    /// Returns a terminal state (final answer set, decision `Reject`) when the
    /// retry budget is spent or the query is non-legal or ambiguous; otherwise
    /// the admitted state. Assessment failures propagate.
    pub async fn admit(&self, state: &WorkflowState) -> anyhow::Result<WorkflowState> {
        tracing::info!(
            query_len = state.query().chars().count(),
            retry_count = state.retry_count,
            "Gatekeeper received query"
        );

        if state.retry_count >= self.max_retries {
            tracing::info!(
                retry_count = state.retry_count,
                max_retries = self.max_retries,
                "Retry budget exhausted"
            );
            return Ok(state.rejected(RETRY_LIMIT_MESSAGE));
        }

        let assessment: QueryAssessment = self
            .model
            .assess(&Self::build_prompt(state.query()))
            .await?;
        tracing::debug!(
            is_legal = assessment.is_legal,
            is_clear = assessment.is_clear,
            reason = %assessment.reason,
            "Pre-validation result"
        );

        if !assessment.is_legal {
            tracing::info!("Rejected non-legal query");
            return Ok(state.rejected(NON_LEGAL_MESSAGE));
        }

        if !assessment.is_clear {
            let next = state.with_retry();
            let message = if next.retry_count >= self.max_retries {
                RETRY_LIMIT_MESSAGE
            } else {
                AMBIGUOUS_MESSAGE
            };
            tracing::info!(retry_count = next.retry_count, "Rejected ambiguous query");
            return Ok(next.rejected(message));
        }

        Ok(state.admitted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{model, ScriptedProvider};
    use crate::workflow::state::GatekeeperDecision;

    const LEGAL_CLEAR: &str = r#"{"is_legal": true, "is_clear": true, "reason": "Asks about bail"}"#;
    const NOT_LEGAL: &str = r#"{"is_legal": false, "is_clear": true, "reason": "Gibberish"}"#;
    const AMBIGUOUS: &str = r#"{"is_legal": true, "is_clear": false, "reason": "Too vague"}"#;

    #[tokio::test]
    async fn admits_legal_clear_query() {
        let provider = ScriptedProvider::new([LEGAL_CLEAR]);
        let gatekeeper = Gatekeeper::new(model(&provider), 2);
        let state = gatekeeper
            .admit(&WorkflowState::new("Can I get anticipatory bail?"))
            .await
            .unwrap();
        assert_eq!(state.gatekeeper_decision, Some(GatekeeperDecision::Admit));
        assert!(!state.is_terminal());
        assert_eq!(state.retry_count, 0);
        assert!(provider.prompts()[0].contains("Can I get anticipatory bail?"));
    }

    #[tokio::test]
    async fn rejects_non_legal_without_touching_retries() {
        let provider = ScriptedProvider::new([NOT_LEGAL]);
        let gatekeeper = Gatekeeper::new(model(&provider), 2);
        let start = WorkflowState::new("asdf").with_retry();
        let state = gatekeeper.admit(&start).await.unwrap();
        assert_eq!(state.final_answer(), Some(NON_LEGAL_MESSAGE));
        assert_eq!(state.gatekeeper_decision, Some(GatekeeperDecision::Reject));
        assert_eq!(state.retry_count, 1);
    }

    #[tokio::test]
    async fn ambiguous_query_consumes_a_retry() {
        let provider = ScriptedProvider::new([AMBIGUOUS]);
        let gatekeeper = Gatekeeper::new(model(&provider), 2);
        let state = gatekeeper.admit(&WorkflowState::new("law stuff?")).await.unwrap();
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.final_answer(), Some(AMBIGUOUS_MESSAGE));
        assert_eq!(state.gatekeeper_decision, Some(GatekeeperDecision::Reject));
    }

    #[tokio::test]
    async fn second_ambiguous_pass_hits_retry_limit() {
        let provider = ScriptedProvider::new([AMBIGUOUS]);
        let gatekeeper = Gatekeeper::new(model(&provider), 2);
        let start = WorkflowState::new("law stuff?").with_retry();
        let state = gatekeeper.admit(&start).await.unwrap();
        assert_eq!(state.retry_count, 2);
        assert_eq!(state.final_answer(), Some(RETRY_LIMIT_MESSAGE));
    }

    #[tokio::test]
    async fn exhausted_budget_short_circuits_assessment() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        let gatekeeper = Gatekeeper::new(model(&provider), 2);
        let start = WorkflowState::new("anything").with_retry().with_retry();
        let state = gatekeeper.admit(&start).await.unwrap();
        assert_eq!(state.final_answer(), Some(RETRY_LIMIT_MESSAGE));
        assert_eq!(state.retry_count, 2);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn unparseable_assessment_is_an_error() {
        let provider = ScriptedProvider::new(["Sure, that looks legal to me."]);
        let gatekeeper = Gatekeeper::new(model(&provider), 2);
        assert!(gatekeeper.admit(&WorkflowState::new("q")).await.is_err());
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        provider.push_error("connection reset");
        let gatekeeper = Gatekeeper::new(model(&provider), 2);
        let err = gatekeeper.admit(&WorkflowState::new("q")).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
