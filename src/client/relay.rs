//! Relay client handling correlation ids and result decoding.

use serde_json::Value;
use thiserror::Error;

use super::ops::{ExecuteResult, Row};
use crate::error::ErrorCode;
use crate::generate_request_id;
use crate::protocol::{Action, Params, Request, Response};
use crate::router::RouterHandle;

/// Errors returned by [`RelayClient`] calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The router answered with an error response.
    #[error("{message}")]
    Remote { code: ErrorCode, message: String },

    /// The response does not belong to the request that was sent.
    #[error("response id {actual} does not match request id {expected}")]
    IdMismatch { expected: Value, actual: Value },

    /// The result payload does not have the shape the action promises.
    #[error("unexpected result for {action}: {result}")]
    UnexpectedResult { action: Action, result: Value },
}

impl ClientError {
    /// Error code of a remote failure.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Client issuing typed calls through a router handle.
#[derive(Clone)]
pub struct RelayClient {
    router: RouterHandle,
}

impl RelayClient {
    pub fn new(router: RouterHandle) -> Self {
        Self { router }
    }

    /// Open a fresh in-memory database, replacing any open one.
    pub async fn open(&self) -> Result<(), ClientError> {
        let request = Request::new(generate_request_id(), Action::Open);
        self.call(request).await.map(|_| ())
    }

    /// Run a statement and return the number of rows it modified.
    ///
    /// Passing `None` runs `sql` as a multi-statement script.
    pub async fn execute(
        &self,
        sql: &str,
        params: Option<Params>,
    ) -> Result<ExecuteResult, ClientError> {
        let request = Request::statement(generate_request_id(), Action::Execute, sql, params);
        let result = self.call(request).await?;
        serde_json::from_value(result.clone()).map_err(|_| ClientError::UnexpectedResult {
            action: Action::Execute,
            result,
        })
    }

    /// Run a query and return all of its rows.
    pub async fn query(&self, sql: &str, params: Option<Params>) -> Result<Vec<Row>, ClientError> {
        let request = Request::statement(generate_request_id(), Action::Query, sql, params);
        match self.call(request).await? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(ClientError::UnexpectedResult {
                        action: Action::Query,
                        result: other,
                    }),
                })
                .collect(),
            other => Err(ClientError::UnexpectedResult {
                action: Action::Query,
                result: other,
            }),
        }
    }

    /// Close the database. Succeeds when none is open.
    pub async fn close(&self) -> Result<(), ClientError> {
        let request = Request::new(generate_request_id(), Action::Close);
        self.call(request).await.map(|_| ())
    }

    async fn call(&self, request: Request) -> Result<Value, ClientError> {
        let expected = request.id.clone();
        let response = self.router.dispatch(request).await;
        check_response(&expected, response)
    }
}

fn check_response(expected: &Value, response: Response) -> Result<Value, ClientError> {
    if response.id() != expected {
        return Err(ClientError::IdMismatch {
            expected: expected.clone(),
            actual: response.id().clone(),
        });
    }
    response
        .into_outcome()
        .map_err(|(message, code)| ClientError::Remote { code, message })
}
