//! One-time engine initialization.
//!
//! The engine is checked and configured once per process. Initialization
//! runs on a blocking task and is single-flight: concurrent `open` requests
//! all await the same attempt. A failed attempt is not cached.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use rusqlite::{Connection, OpenFlags};
use tokio::sync::OnceCell;

use crate::error::RouterError;

/// Oldest SQLite release the router accepts (3.35.0, `RETURNING` support).
pub const MIN_SQLITE_VERSION: i32 = 3_035_000;

/// An initialized engine, able to create in-memory databases.
#[derive(Debug, Clone)]
pub struct EngineRuntime {
    version: &'static str,
    flags: OpenFlags,
}

impl EngineRuntime {
    /// Initialize the engine on a blocking task.
    pub async fn load() -> Result<Self, RouterError> {
        tokio::task::spawn_blocking(Self::load_blocking)
            .await
            .map_err(|e| RouterError::EngineInit(e.to_string()))?
    }

    pub(crate) fn load_blocking() -> Result<Self, RouterError> {
        let number = rusqlite::version_number();
        if number < MIN_SQLITE_VERSION {
            return Err(RouterError::EngineInit(format!(
                "SQLite {} is older than the required 3.35.0",
                rusqlite::version()
            )));
        }

        // The connection only ever lives on the router thread
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_in_memory_with_flags(flags)
            .map_err(|e| RouterError::EngineInit(e.to_string()))?;
        conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| RouterError::EngineInit(e.to_string()))?;

        tracing::info!(sqlite_version = rusqlite::version(), "Engine runtime initialized");

        Ok(Self {
            version: rusqlite::version(),
            flags,
        })
    }

    /// Create a fresh, empty in-memory database.
    pub fn open_database(&self) -> Result<Connection, RouterError> {
        Ok(Connection::open_in_memory_with_flags(self.flags)?)
    }

    /// Version string of the linked SQLite library.
    pub fn version(&self) -> &'static str {
        self.version
    }
}

/// Lazily initialized runtime shared by router handles.
///
/// Cloning shares the same cell. [`SharedRuntime::global`] is the
/// process-wide instance; [`SharedRuntime::new`] gives an isolated one.
#[derive(Clone, Default)]
pub struct SharedRuntime {
    cell: Arc<OnceCell<Arc<EngineRuntime>>>,
    attempts: Arc<AtomicUsize>,
}

impl SharedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide runtime.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<SharedRuntime> = OnceLock::new();
        GLOBAL.get_or_init(SharedRuntime::new).clone()
    }

    /// Return the runtime, initializing it on first use.
    pub async fn get(&self) -> Result<Arc<EngineRuntime>, RouterError> {
        self.get_with(EngineRuntime::load).await
    }

    /// Return the runtime, running `load` if no attempt has succeeded yet.
    async fn get_with<F, Fut>(&self, load: F) -> Result<Arc<EngineRuntime>, RouterError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<EngineRuntime, RouterError>>,
    {
        let runtime = self
            .cell
            .get_or_try_init(|| async {
                self.attempts.fetch_add(1, Ordering::Relaxed);
                load().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(runtime))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of initialization attempts made so far.
    pub fn init_attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}
