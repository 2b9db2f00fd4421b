//! Embedded SQL engine layer.
//!
//! Provides:
//! - One-time engine initialization shared by every session
//! - The session object owning the single in-memory database handle
//! - Conversion between JSON values and SQLite values

pub mod runtime;
pub mod session;
pub mod value;

pub use runtime::{EngineRuntime, SharedRuntime};
pub use session::Session;
