//! Observability infrastructure.
//!
//! Provides structured tracing on stderr; stdout is reserved for protocol
//! responses.

pub mod tracing;
