//! The record threaded through every workflow node.
//!
//! Nodes never mutate a shared state: each takes the current
//! [`WorkflowState`] by reference and returns the next one.

use serde::{Deserialize, Serialize};

/// Outcome of a gatekeeper pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatekeeperDecision {
    Admit,
    Reject,
}

/// Which responder handles an admitted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderKind {
    /// General explanation from model knowledge.
    Explain,
    /// Answer grounded in passages from the document index.
    Retrieve,
    /// Summary of live web content.
    Web,
}

impl ResponderKind {
    pub const ALL: &'static [ResponderKind] = &[Self::Explain, Self::Retrieve, Self::Web];

    pub fn id(self) -> &'static str {
        match self {
            Self::Explain => "explain",
            Self::Retrieve => "retrieve",
            Self::Web => "web",
        }
    }

    /// Parse a classifier label. Accepts both our ids and the short labels
    /// the routing prompt asks for (`llm`, `rag`, `web`).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "explain" | "llm" => Some(Self::Explain),
            "retrieve" | "rag" => Some(Self::Retrieve),
            "web" | "crawler" | "web_crawler" => Some(Self::Web),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResponderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Validator verdict on a draft answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowState {
    query: String,
    pub gatekeeper_decision: Option<GatekeeperDecision>,
    pub responder_kind: Option<ResponderKind>,
    pub draft_answer: Option<String>,
    pub validation: Option<Validation>,
    pub retry_count: u32,
    final_answer: Option<String>,
}

impl WorkflowState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            gatekeeper_decision: None,
            responder_kind: None,
            draft_answer: None,
            validation: None,
            retry_count: 0,
            final_answer: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    /// A state is terminal once it carries a final answer.
    pub fn is_terminal(&self) -> bool {
        self.final_answer.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.is_valid)
    }

    // ── Transitions ──────────────────────────────────────────────

    pub fn admitted(&self) -> Self {
        Self {
            gatekeeper_decision: Some(GatekeeperDecision::Admit),
            ..self.clone()
        }
    }

    /// Gatekeeper rejection: records the decision and ends the workflow.
    pub fn rejected(&self, message: &str) -> Self {
        Self {
            gatekeeper_decision: Some(GatekeeperDecision::Reject),
            ..self.clone()
        }
        .with_final_answer(message)
    }

    pub fn with_retry(&self) -> Self {
        Self {
            retry_count: self.retry_count.saturating_add(1),
            ..self.clone()
        }
    }

    /// The responder kind is fixed once chosen.
    pub fn with_responder_kind(&self, kind: ResponderKind) -> Self {
        if let Some(existing) = self.responder_kind {
            if existing != kind {
                tracing::warn!(
                    existing = %existing,
                    requested = %kind,
                    "Responder kind already set, keeping the original"
                );
            }
            return self.clone();
        }
        Self {
            responder_kind: Some(kind),
            ..self.clone()
        }
    }

    /// New draft; any verdict on the previous draft is discarded.
    pub fn with_draft(&self, draft: &str) -> Self {
        Self {
            draft_answer: Some(draft.trim().to_string()),
            validation: None,
            ..self.clone()
        }
    }

    pub fn with_validation(&self, validation: Validation) -> Self {
        Self {
            validation: Some(validation),
            ..self.clone()
        }
    }

    /// Set the final answer. It is write-once: a second write is ignored.
    pub fn with_final_answer(&self, answer: &str) -> Self {
        if self.final_answer.is_some() {
            tracing::warn!("Final answer already set, ignoring second write");
            return self.clone();
        }
        Self {
            final_answer: Some(answer.to_string()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_blank() {
        let state = WorkflowState::new("What is bail?");
        assert_eq!(state.query(), "What is bail?");
        assert_eq!(state.retry_count, 0);
        assert!(!state.is_terminal());
        assert!(state.gatekeeper_decision.is_none());
        assert!(state.responder_kind.is_none());
    }

    #[test]
    fn transitions_do_not_touch_the_input() {
        let state = WorkflowState::new("q");
        let next = state.with_retry().admitted();
        assert_eq!(state.retry_count, 0);
        assert!(state.gatekeeper_decision.is_none());
        assert_eq!(next.retry_count, 1);
        assert_eq!(next.gatekeeper_decision, Some(GatekeeperDecision::Admit));
    }

    #[test]
    fn final_answer_is_write_once() {
        let state = WorkflowState::new("q").rejected("first");
        let again = state.with_final_answer("second");
        assert_eq!(again.final_answer(), Some("first"));
        assert!(again.is_terminal());
    }

    #[test]
    fn responder_kind_is_immutable_once_set() {
        let state = WorkflowState::new("q").with_responder_kind(ResponderKind::Retrieve);
        let again = state.with_responder_kind(ResponderKind::Web);
        assert_eq!(again.responder_kind, Some(ResponderKind::Retrieve));
    }

    #[test]
    fn new_draft_clears_previous_verdict() {
        let state = WorkflowState::new("q")
            .with_draft("  first  ")
            .with_validation(Validation {
                is_valid: false,
                reason: "incomplete".into(),
            });
        assert_eq!(state.draft_answer.as_deref(), Some("first"));
        let redrafted = state.with_draft("second");
        assert!(redrafted.validation.is_none());
        assert!(!redrafted.is_valid());
    }

    #[test]
    fn labels_map_onto_kinds() {
        assert_eq!(ResponderKind::from_label("llm"), Some(ResponderKind::Explain));
        assert_eq!(ResponderKind::from_label(" RAG "), Some(ResponderKind::Retrieve));
        assert_eq!(ResponderKind::from_label("\"web\""), Some(ResponderKind::Web));
        assert_eq!(ResponderKind::from_label("crawler"), Some(ResponderKind::Web));
        assert_eq!(ResponderKind::from_label("retrieve"), Some(ResponderKind::Retrieve));
        assert_eq!(ResponderKind::from_label("search"), None);
        for kind in ResponderKind::ALL {
            assert_eq!(ResponderKind::from_label(kind.id()), Some(*kind));
        }
    }
}
