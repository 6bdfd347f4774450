use async_trait::async_trait;

use crate::workflow::state::ResponderKind;

/// Produces a draft answer for an admitted query.
///
/// Implementations own whatever capabilities they need (model, index,
/// fetcher). A returned error is a capability failure and ends the run.
#[async_trait]
pub trait Responder: Send + Sync {
    fn kind(&self) -> ResponderKind;

    async fn respond(&self, query: &str) -> anyhow::Result<String>;
}
