//! lexgate: a gated legal research assistant.
//!
//! Each query passes through a gatekeeper, is routed to one of three
//! responders (explanation, document retrieval, live web content), and the
//! draft is validated before it becomes the final answer. Rejected drafts
//! loop back through the gatekeeper under a bounded retry budget.

pub mod config;
pub mod gatekeeper;
pub mod gateway;
pub mod providers;
pub mod responders;
pub mod retrieval;
pub mod tools;
pub mod workflow;

pub use config::Config;
pub use workflow::{Terminal, Workflow, WorkflowError, WorkflowOutcome};
