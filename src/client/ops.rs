//! Operation result types for the relay client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of an execute operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResult {
    /// Rows modified by the statement.
    pub changes: u64,
}

/// One row returned by a query.
pub type Row = Map<String, Value>;
