//! Drives a query through gatekeeping, routing, drafting and validation.
//!
//! The controller is a small explicit state machine. Every node takes the
//! current [`WorkflowState`] and returns the next one; the controller only
//! decides which node runs next and when the run is over.

use anyhow::Context;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::state::{GatekeeperDecision, ResponderKind, WorkflowState};
use super::validator::Validator;
use super::WorkflowError;
use crate::config::Config;
use crate::gatekeeper::{Gatekeeper, QueryRouter};
use crate::providers::{create_embedder, create_provider, LanguageModel};
use crate::responders::{ExplainResponder, ResponderSet, RetrievalResponder, WebResponder};
use crate::retrieval::SqliteVectorIndex;
use crate::tools::HttpWebFetcher;

/// Shown when a capability fails mid-run.
pub const FAILURE_MESSAGE: &str =
    "⚠️ We could not complete your request due to an internal error. Please try again later.";

/// Shown when the caller cancels a run.
pub const CANCELLED_MESSAGE: &str = "⚠️ Your request was cancelled before an answer was ready.";

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// A validated draft became the final answer.
    Finalized,
    /// The gatekeeper turned the query away.
    Rejected,
    /// A capability failed or the run was cancelled.
    Failed,
}

/// What the caller gets back from a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowOutcome {
    pub final_answer: String,
    pub responder_kind: Option<ResponderKind>,
    pub terminal: Terminal,
    pub retry_count: u32,
}

impl WorkflowOutcome {
    fn from_state(state: &WorkflowState, terminal: Terminal) -> Self {
        Self {
            final_answer: state.final_answer().unwrap_or(FAILURE_MESSAGE).to_string(),
            responder_kind: state.responder_kind,
            terminal,
            retry_count: state.retry_count,
        }
    }

    fn failed(state: &WorkflowState, message: &str) -> Self {
        Self {
            final_answer: message.to_string(),
            responder_kind: state.responder_kind,
            terminal: Terminal::Failed,
            retry_count: state.retry_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Gatekeeping,
    Classifying,
    Responding,
    Validating,
    Finalizing,
}

/// Copy the validated draft into the final answer.
pub fn finalize(state: &WorkflowState) -> anyhow::Result<WorkflowState> {
    let draft = state
        .draft_answer
        .as_deref()
        .context("Nothing to finalize: no draft answer")?;
    if !state.is_valid() {
        anyhow::bail!("Refusing to finalize a draft that did not pass validation");
    }
    Ok(state.with_final_answer(draft))
}

pub struct Workflow {
    gatekeeper: Gatekeeper,
    router: QueryRouter,
    responders: ResponderSet,
    validator: Validator,
    max_steps: u32,
}

impl Workflow {
    pub fn new(
        gatekeeper: Gatekeeper,
        router: QueryRouter,
        responders: ResponderSet,
        validator: Validator,
        max_steps: u32,
    ) -> Self {
        Self {
            gatekeeper,
            router,
            responders,
            validator,
            max_steps,
        }
    }

    /// Wire every node to the backends named in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = create_provider(&config.provider)?;
        let model = LanguageModel::from_config(provider, &config.provider);
        let embedder =
            create_embedder(&config.provider, config.retrieval.embedding_model.as_deref())?;

        let index = Arc::new(SqliteVectorIndex::new(
            config.retrieval.resolved_index_path(),
            embedder,
        ));
        let fetcher = Arc::new(HttpWebFetcher::new(
            config.web.timeout_secs,
            config.web.max_chars,
        ));

        let responders = ResponderSet {
            explain: Arc::new(ExplainResponder::new(model.clone())),
            retrieve: Arc::new(RetrievalResponder::new(
                model.clone(),
                index,
                config.retrieval.top_k,
            )),
            web: Arc::new(WebResponder::new(
                model.clone(),
                fetcher,
                config.web.source_url.clone(),
            )),
        };

        tracing::debug!(
            provider = model.provider_name(),
            model = model.model(),
            max_retries = config.workflow.max_retries,
            "Workflow configured"
        );

        Ok(Self::new(
            Gatekeeper::new(model.clone(), config.workflow.max_retries),
            QueryRouter::new(model.clone()),
            responders,
            Validator::new(model),
            config.workflow.max_steps,
        ))
    }

    /// Run a query to completion. Capability failures become a `Failed`
    /// outcome carrying a generic message.
    pub async fn run(&self, query: &str) -> WorkflowOutcome {
        self.run_with_cancel(query, &CancellationToken::new()).await
    }

    /// Like [`Workflow::run`], but stops at the next suspension point once
    /// `cancel` fires.
    pub async fn run_with_cancel(&self, query: &str, cancel: &CancellationToken) -> WorkflowOutcome {
        let mut state = WorkflowState::new(query);
        match self.drive(&mut state, cancel).await {
            Ok(outcome) => outcome,
            Err(WorkflowError::Cancelled) => {
                tracing::warn!(retry_count = state.retry_count, "Workflow cancelled");
                WorkflowOutcome::failed(&state, CANCELLED_MESSAGE)
            }
            Err(e) => {
                tracing::error!(
                    stage = e.stage(),
                    retry_count = state.retry_count,
                    "Workflow failed: {e}"
                );
                WorkflowOutcome::failed(&state, FAILURE_MESSAGE)
            }
        }
    }

    /// Run a query, surfacing capability failures to the caller.
    pub async fn try_run(&self, query: &str) -> Result<WorkflowOutcome, WorkflowError> {
        let mut state = WorkflowState::new(query);
        self.drive(&mut state, &CancellationToken::new()).await
    }

    /// `state` always holds the last good state, so a failed run can still
    /// report how far it got.
    async fn drive(
        &self,
        state: &mut WorkflowState,
        cancel: &CancellationToken,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        tracing::info!(query_len = state.query().chars().count(), "Workflow started");
        let mut step = Step::Gatekeeping;

        for _ in 0..self.max_steps {
            tracing::debug!(step = ?step, retry_count = state.retry_count, "Workflow step");
            step = match step {
                Step::Gatekeeping => {
                    let next =
                        stage(cancel, self.gatekeeper.admit(state), WorkflowError::Gatekeeper)
                            .await?;
                    *state = next;
                    if state.is_terminal() {
                        let outcome = WorkflowOutcome::from_state(state, Terminal::Rejected);
                        tracing::info!(
                            retry_count = outcome.retry_count,
                            "Workflow ended at gatekeeper"
                        );
                        return Ok(outcome);
                    }
                    if state.gatekeeper_decision != Some(GatekeeperDecision::Admit) {
                        return Err(WorkflowError::Gatekeeper(anyhow::anyhow!(
                            "Gatekeeper returned neither a decision nor a final answer"
                        )));
                    }
                    if state.responder_kind.is_some() {
                        Step::Responding
                    } else {
                        Step::Classifying
                    }
                }
                Step::Classifying => {
                    let next =
                        stage(cancel, self.router.classify(state), WorkflowError::Classifier)
                            .await?;
                    *state = next;
                    Step::Responding
                }
                Step::Responding => {
                    let next =
                        stage(cancel, self.responders.respond(state), WorkflowError::Responder)
                            .await?;
                    *state = next;
                    Step::Validating
                }
                Step::Validating => {
                    let next =
                        stage(cancel, self.validator.validate(state), WorkflowError::Validator)
                            .await?;
                    *state = next;
                    if state.is_valid() {
                        Step::Finalizing
                    } else {
                        *state = state.with_retry();
                        tracing::info!(
                            retry_count = state.retry_count,
                            "Draft rejected, returning to gatekeeper"
                        );
                        Step::Gatekeeping
                    }
                }
                Step::Finalizing => {
                    *state = finalize(state).map_err(WorkflowError::Validator)?;
                    let outcome = WorkflowOutcome::from_state(state, Terminal::Finalized);
                    tracing::info!(
                        responder = ?outcome.responder_kind,
                        retry_count = outcome.retry_count,
                        "Workflow finalized"
                    );
                    return Ok(outcome);
                }
            };
        }

        Err(WorkflowError::StepLimit(self.max_steps))
    }
}

/// Await one node, giving up early if the run is cancelled.
async fn stage<F>(
    cancel: &CancellationToken,
    node: F,
    wrap: fn(anyhow::Error) -> WorkflowError,
) -> Result<WorkflowState, WorkflowError>
where
    F: Future<Output = anyhow::Result<WorkflowState>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(WorkflowError::Cancelled),
        result = node => result.map_err(wrap),
    }
}
