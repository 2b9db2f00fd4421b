//! Error type for router operations.
//!
//! Every failure a request can hit is a [`RouterError`] variant. The router
//! converts it into an error response at the dispatch boundary; the
//! [`ErrorCode`] is the machine-readable tag that travels with the message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while dispatching a request.
#[derive(Debug, Error)]
pub enum RouterError {
    /// `execute` or `query` was issued with no open database.
    #[error("Database not opened")]
    NotOpened,

    /// The action name is not one the router understands.
    #[error("Unknown action: {action}")]
    UnknownAction { action: String },

    /// The request arguments are missing or malformed.
    #[error("invalid arguments for {action}: {reason}")]
    InvalidArgs { action: String, reason: String },

    /// A parameter could not be bound to the statement.
    #[error("cannot bind parameter {position}: {reason}")]
    Bind { position: String, reason: String },

    /// The embedded engine rejected the operation.
    #[error("{0}")]
    Engine(#[from] rusqlite::Error),

    /// One-time engine initialization failed.
    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    /// The router thread could not be started.
    #[error("failed to start router thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The router thread is no longer accepting requests.
    #[error("router is shutting down")]
    Unavailable,

    /// The router thread panicked.
    #[error("router thread panicked")]
    ThreadPanic,
}

impl RouterError {
    /// The wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotOpened => ErrorCode::NotOpened,
            Self::UnknownAction { .. } => ErrorCode::UnknownAction,
            Self::InvalidArgs { .. } => ErrorCode::InvalidArgs,
            Self::Bind { .. } => ErrorCode::Bind,
            Self::Engine(_) => ErrorCode::Engine,
            Self::EngineInit(_) => ErrorCode::EngineInit,
            Self::Spawn(_) | Self::Unavailable | Self::ThreadPanic => ErrorCode::Unavailable,
        }
    }

    pub(crate) fn invalid_args(action: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgs {
            action: action.to_string(),
            reason: reason.into(),
        }
    }
}

/// Machine-readable error tag carried by error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotOpened,
    UnknownAction,
    InvalidArgs,
    Bind,
    Engine,
    EngineInit,
    Unavailable,
    /// The inbound message could not be decoded at all.
    InvalidRequest,
}
