//! Gatekeeping and routing for incoming legal queries.
//!
//! The supervisor decides whether a query enters the workflow at all:
//! - Non-legal queries are turned away with a fixed message
//! - Ambiguous queries consume one retry and ask the user to rephrase
//! - Once the retry budget is spent, every pass terminates
//!
//! Admitted queries go to the router, which picks exactly one responder.
//!
//! ## Design
//! - Both decisions are made by the configured model through structured
//!   JSON prompts, parsed into typed verdicts
//! - Labels outside the responder enum never leave this module

pub mod router;
pub mod supervisor;

#[allow(unused_imports)]
pub use router::{QueryRouter, RouteLabel};
#[allow(unused_imports)]
pub use supervisor::{
    Gatekeeper, QueryAssessment, AMBIGUOUS_MESSAGE, NON_LEGAL_MESSAGE, RETRY_LIMIT_MESSAGE,
};
