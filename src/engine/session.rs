//! The session object owning the single database handle.
//!
//! A session holds at most one in-memory database. `open` creates it (or
//! replaces the current one), `close` drops it, and `execute`/`query` fail
//! with [`RouterError::NotOpened`] while there is none.

use rusqlite::Connection;
use serde_json::{Map, Value};

use super::runtime::EngineRuntime;
use super::value;
use crate::error::RouterError;
use crate::protocol::Params;

/// A materialized result row, column name to value, in column order.
pub type Record = Map<String, Value>;

/// Session state for one router.
#[derive(Debug, Default)]
pub struct Session {
    conn: Option<Connection>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Create a fresh in-memory database, replacing any open one.
    pub fn open(&mut self, runtime: &EngineRuntime) -> Result<(), RouterError> {
        let conn = runtime.open_database()?;
        if self.conn.replace(conn).is_some() {
            tracing::debug!("Replaced previously open database");
        }
        Ok(())
    }

    /// Run a statement and return the number of rows it modified.
    ///
    /// Without params `sql` runs as a script and may hold several
    /// statements; the count is that of the last one. With params `sql` is a
    /// single statement, bound and stepped once.
    pub fn execute(&mut self, sql: &str, params: Option<&Params>) -> Result<u64, RouterError> {
        let conn = self.conn.as_ref().ok_or(RouterError::NotOpened)?;

        match params {
            None => conn.execute_batch(sql)?,
            Some(params) => {
                let mut stmt = conn.prepare(sql)?;
                value::bind(&mut stmt, params)?;
                let mut rows = stmt.raw_query();
                let _first = rows.next()?;
            }
        }

        Ok(conn.changes())
    }

    /// Run a query and return every row, fully buffered.
    pub fn query(&mut self, sql: &str, params: Option<&Params>) -> Result<Vec<Record>, RouterError> {
        let conn = self.conn.as_ref().ok_or(RouterError::NotOpened)?;

        let mut stmt = conn.prepare(sql)?;
        if let Some(params) = params {
            value::bind(&mut stmt, params)?;
        }
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut records = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            let mut record = Record::with_capacity(columns.len());
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), value::to_json(row.get_ref(idx)?));
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Close the database if one is open. Closing twice is a no-op.
    ///
    /// If the engine refuses to close, the handle stays open and the engine
    /// error is returned.
    pub fn close(&mut self) -> Result<(), RouterError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        if let Err((conn, err)) = conn.close() {
            self.conn = Some(conn);
            return Err(err.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_session() -> Session {
        let runtime = EngineRuntime::load_blocking().unwrap();
        let mut session = Session::new();
        session.open(&runtime).unwrap();
        session
    }

    fn positional(values: Vec<Value>) -> Params {
        Params::Positional(values)
    }

    #[test]
    fn test_execute_before_open_fails() {
        let mut session = Session::new();
        let err = session.execute("SELECT 1", None).unwrap_err();
        assert!(matches!(err, RouterError::NotOpened));
        let err = session.query("SELECT 1", None).unwrap_err();
        assert!(matches!(err, RouterError::NotOpened));
    }

    #[test]
    fn test_insert_reports_changes() {
        let mut session = open_session();
        session.execute("CREATE TABLE t(x)", Some(&positional(vec![]))).unwrap();
        let changes = session
            .execute("INSERT INTO t VALUES (?)", Some(&positional(vec![json!(5)])))
            .unwrap();
        assert_eq!(changes, 1);
    }

    #[test]
    fn test_script_runs_every_statement() {
        let mut session = open_session();
        let changes = session
            .execute(
                "CREATE TABLE t(x); INSERT INTO t VALUES (1); INSERT INTO t VALUES (2), (3);",
                None,
            )
            .unwrap();
        assert_eq!(changes, 2);

        let rows = session.query("SELECT COUNT(*) AS n FROM t", None).unwrap();
        assert_eq!(rows[0].get("n"), Some(&json!(3)));
    }

    #[test]
    fn test_query_preserves_insertion_and_column_order() {
        let mut session = open_session();
        session.execute("CREATE TABLE t(b, a)", None).unwrap();
        for (b, a) in [(1, "one"), (2, "two"), (3, "three")] {
            session
                .execute(
                    "INSERT INTO t VALUES (?, ?)",
                    Some(&positional(vec![json!(b), json!(a)])),
                )
                .unwrap();
        }

        let rows = session.query("SELECT b, a FROM t", Some(&positional(vec![]))).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(Value::Object(rows[1].clone()), json!({"b": 2, "a": "two"}));
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_query_with_named_params() {
        let mut session = open_session();
        session
            .execute("CREATE TABLE t(x); INSERT INTO t VALUES (1), (2), (3);", None)
            .unwrap();

        let mut named = Map::new();
        named.insert(":min".into(), json!(2));
        let rows = session
            .query("SELECT x FROM t WHERE x >= :min", Some(&Params::Named(named)))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("x"), Some(&json!(2)));
    }

    #[test]
    fn test_duplicate_column_keeps_last_value() {
        let mut session = open_session();
        let rows = session.query("SELECT 1 AS v, 2 AS v", None).unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0].get("v"), Some(&json!(2)));
    }

    #[test]
    fn test_engine_error_is_propagated() {
        let mut session = open_session();
        let err = session.execute("SELEC nonsense", None).unwrap_err();
        assert!(matches!(err, RouterError::Engine(_)));
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_reopen_replaces_database() {
        let runtime = EngineRuntime::load_blocking().unwrap();
        let mut session = Session::new();
        session.open(&runtime).unwrap();
        session.execute("CREATE TABLE t(x)", None).unwrap();

        session.open(&runtime).unwrap();
        let err = session.query("SELECT x FROM t", None).unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = open_session();
        session.close().unwrap();
        assert!(!session.is_open());
        session.close().unwrap();

        let err = session.execute("SELECT 1", None).unwrap_err();
        assert!(matches!(err, RouterError::NotOpened));
    }
}
