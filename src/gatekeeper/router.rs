//! Query router.
//!
//! Classifies an admitted query into the responder that should answer it.
//! The model picks a label; anything outside the known labels falls back to
//! the general explanation responder.

use serde::{Deserialize, Serialize};

use crate::providers::LanguageModel;
use crate::workflow::state::{GatekeeperDecision, ResponderKind, WorkflowState};

/// Raw classifier output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLabel {
    pub query_type: String,
}

impl RouteLabel {
    /// Map onto a responder, downgrading unknown labels to `Explain`.
    pub fn resolve(&self) -> ResponderKind {
        ResponderKind::from_label(&self.query_type).unwrap_or_else(|| {
            tracing::warn!(
                label = %self.query_type,
                "Unknown query type from classifier, falling back to explain"
            );
            ResponderKind::Explain
        })
    }
}

pub struct QueryRouter {
    model: LanguageModel,
}

impl QueryRouter {
    pub fn new(model: LanguageModel) -> Self {
        Self { model }
    }

    fn build_prompt(query: &str) -> String {
        format!(
            r#"You are a highly knowledgeable legal assistant specializing in query classification.
Evaluate the following user query and classify it into one of the following categories based on its primary intent:

Query:
{query}

Categories:
- "llm": Queries seeking general legal explanations, definitions, or concepts (e.g., "What is defamation in law?").
- "rag": Queries requesting retrieval of specific case law, acts, statutes, or legal documents (e.g., "What does Section 230 of the Communications Decency Act say?").
- "web": Queries asking for real-time updates, recent rulings, or the latest legal developments (e.g., "What are the latest data privacy rulings in India?").

Classification rules:
- Focus on the query's primary intent. If the query has multiple intents, prioritize the most dominant one.
- If the query explicitly seeks "latest" or "recent" legal information, classify it as "web" unless it specifies a known document or case.
- If the query references a specific legal document, case, or statute, classify it as "rag" even if it asks for explanation.
- If the query is ambiguous or doesn't fit any category, classify it as "llm".
- Consider the jurisdiction if specified (e.g., "recent US rulings" is "web", but "US Constitution Article 1" is "rag").

Respond ONLY with valid JSON in the format:
{{ "query_type": "category" }}

The value of "query_type" must be one of "llm", "rag", "web". Do not include any additional text."#
        )
    }

    /// Choose the responder for an admitted query.
    ///
    /// The state must have been admitted by the gatekeeper.
    pub async fn classify(&self, state: &WorkflowState) -> anyhow::Result<WorkflowState> {
        if state.gatekeeper_decision != Some(GatekeeperDecision::Admit) {
            anyhow::bail!("Router invoked on a query the gatekeeper did not admit");
        }

        let label: RouteLabel = self
            .model
            .assess(&Self::build_prompt(state.query()))
            .await?;
        let kind = label.resolve();
        tracing::info!(responder = %kind, label = %label.query_type, "Classified query");
        Ok(state.with_responder_kind(kind))
    }
}
