//! sqlrelay: a message-dispatch shim for an in-memory SQLite engine.
//!
//! Requests (`open`, `execute`, `query`, `close`) arrive as tagged messages,
//! are executed one at a time on a dedicated router thread that owns the
//! database session, and are answered with a response carrying the same
//! correlation id.
//!
//! # Architecture
//!
//! - **Single session**: at most one in-memory database per router
//! - **Background thread**: all engine calls are serialized on one thread
//! - **Lazy engine init**: single-flight, cached for the process
//! - **Tagged errors**: every failure becomes an error response, never a crash
//!
//! # Modules
//!
//! - [`client`]: Typed foreground client with correlation ids
//! - [`config`]: CLI and environment configuration
//! - [`engine`]: Engine runtime, session and value conversion
//! - [`error`]: Router error type and wire error codes
//! - [`observability`]: Tracing setup
//! - [`protocol`]: Request/response wire types
//! - [`router`]: Router thread and its async handle
//! - [`server`]: JSON-lines stdio transport

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions,    // router::RouterHandle is fine
    clippy::must_use_candidate,         // Not all functions need #[must_use]
    clippy::missing_errors_doc,         // Error docs can be verbose
    clippy::missing_panics_doc,         // Panic docs can be verbose
    clippy::needless_raw_string_hashes  // r#""# is fine for SQL
)]

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod router;
pub mod server;

pub use error::{ErrorCode, RouterError};
pub use protocol::{Action, Request, Response};

use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) correlation id.
///
/// # Example
///
/// ```
/// let id = sqlrelay::generate_request_id();
/// assert!(id.len() == 36); // UUID string format
/// ```
#[must_use]
pub fn generate_request_id() -> String {
    Uuid::now_v7().to_string()
}
