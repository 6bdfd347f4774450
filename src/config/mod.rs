//! Configuration for lexgate.
//!
//! Settings live in `~/.lexgate/config.toml`. A default file is written on
//! first use; environment variables override the provider section so keys
//! never have to be stored on disk.

pub mod schema;

#[allow(unused_imports)]
pub use schema::{
    Config, GatewayConfig, ProviderConfig, ProviderKind, RetrievalConfig, WebConfig,
    WorkflowConfig,
};
