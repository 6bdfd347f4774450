//! External helpers used by responders.

pub mod web_fetch;

#[allow(unused_imports)]
pub use web_fetch::{HttpWebFetcher, WebFetcher, FETCH_FAILURE_PREFIX};
