//! Wire types for the request/response protocol.
//!
//! One request produces exactly one response. The response echoes the
//! request's `id` verbatim and carries either a `result` or an `error`
//! (with its [`ErrorCode`]), never both.
//!
//! ```text
//! -> {"id": 7, "action": "execute", "args": {"sql": "INSERT INTO t VALUES (?)", "params": [5]}}
//! <- {"id": 7, "result": {"changes": 1}}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorCode, RouterError};

/// The four operations the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Open,
    Execute,
    Query,
    Close,
}

impl Action {
    /// Wire name of the action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Execute => "execute",
            Self::Query => "query",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "execute" => Ok(Self::Execute),
            "query" => Ok(Self::Query),
            "close" => Ok(Self::Close),
            other => Err(RouterError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }
}

/// Inbound request.
///
/// `action` stays a plain string and `args` stays raw JSON so that a bad
/// action or malformed arguments still yield a response carrying the
/// caller's `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: Value,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl Request {
    /// Request without arguments (`open`, `close`).
    pub fn new(id: impl Into<Value>, action: Action) -> Self {
        Self {
            id: id.into(),
            action: action.as_str().to_string(),
            args: None,
        }
    }

    /// Request carrying a statement (`execute`, `query`).
    pub fn statement(
        id: impl Into<Value>,
        action: Action,
        sql: impl Into<String>,
        params: Option<Params>,
    ) -> Self {
        let args = StatementArgs {
            sql: sql.into(),
            params,
        };
        Self {
            id: id.into(),
            action: action.as_str().to_string(),
            // StatementArgs holds only strings and JSON values
            args: serde_json::to_value(args).ok(),
        }
    }

    /// Resolve the action name.
    pub fn action(&self) -> Result<Action, RouterError> {
        self.action.parse()
    }

    /// Decode the statement arguments of an `execute` or `query` request.
    pub fn statement_args(&self) -> Result<StatementArgs, RouterError> {
        let args = self
            .args
            .as_ref()
            .ok_or_else(|| RouterError::invalid_args(&self.action, "missing args"))?;
        StatementArgs::deserialize(args)
            .map_err(|e| RouterError::invalid_args(&self.action, e.to_string()))
    }
}

/// Arguments of `execute` and `query`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementArgs {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
}

/// Bind values for a statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Params {
    /// Bound by position, first element to `?1`.
    Positional(Vec<Value>),
    /// Bound by name, keys include the prefix (`:id`, `@id`, `$id`).
    Named(Map<String, Value>),
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

/// Outbound response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

impl Response {
    /// Successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
            code: None,
        }
    }

    /// Error response built from a router error.
    pub fn failure(id: Value, err: &RouterError) -> Self {
        Self::error(id, err.code(), err.to_string())
    }

    /// Error response with an explicit code.
    pub fn error(id: Value, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
            code: Some(code),
        }
    }

    /// The echoed correlation id.
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// The success payload, if any.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// The error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Split into the success payload or the error message and code.
    pub fn into_outcome(self) -> Result<Value, (String, ErrorCode)> {
        match (self.result, self.error) {
            (_, Some(message)) => Err((message, self.code.unwrap_or(ErrorCode::Engine))),
            (Some(result), None) => Ok(result),
            (None, None) => Err((
                "response carries neither result nor error".to_string(),
                ErrorCode::InvalidRequest,
            )),
        }
    }
}
