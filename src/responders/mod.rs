//! Responders that draft an answer once a query has been routed.
//!
//! Exactly one responder runs per pass, chosen by an exhaustive match on
//! [`ResponderKind`]. Responders only draft; validation and finalization
//! happen downstream.

pub mod explain;
pub mod retrieval;
pub mod traits;
pub mod web;

use anyhow::Context;
use std::sync::Arc;

use crate::workflow::state::{ResponderKind, WorkflowState};

pub use explain::ExplainResponder;
pub use retrieval::RetrievalResponder;
pub use traits::Responder;
pub use web::WebResponder;

/// One responder per kind.
#[derive(Clone)]
pub struct ResponderSet {
    pub explain: Arc<dyn Responder>,
    pub retrieve: Arc<dyn Responder>,
    pub web: Arc<dyn Responder>,
}

impl ResponderSet {
    pub fn get(&self, kind: ResponderKind) -> &Arc<dyn Responder> {
        match kind {
            ResponderKind::Explain => &self.explain,
            ResponderKind::Retrieve => &self.retrieve,
            ResponderKind::Web => &self.web,
        }
    }

    /// Draft an answer with the responder the state was routed to.
    pub async fn respond(&self, state: &WorkflowState) -> anyhow::Result<WorkflowState> {
        let kind = state
            .responder_kind
            .context("Responder invoked before the query was classified")?;
        let draft = self
            .get(kind)
            .respond(state.query())
            .await
            .with_context(|| format!("{kind} responder failed"))?;
        tracing::info!(
            responder = %kind,
            draft_chars = draft.chars().count(),
            retry_count = state.retry_count,
            "Draft answer ready"
        );
        Ok(state.with_draft(&draft))
    }
}
