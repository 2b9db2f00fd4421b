//! Typed foreground client for the router.
//!
//! Wraps a [`RouterHandle`](crate::router::RouterHandle), assigns a fresh
//! correlation id to every call and decodes responses into typed results.

mod ops;
mod relay;

pub use ops::{ExecuteResult, Row};
pub use relay::{ClientError, RelayClient};
