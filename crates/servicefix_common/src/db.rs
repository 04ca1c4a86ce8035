//! SQLite data access layer.
//!
//! Three primitives: `write` (insert/update), `read_one` (zero or one
//! row), `read_all` (zero or more rows), plus `insert` as the keyed
//! variant of `write` that reports the generated rowid.
//!
//! Every call opens its own connection inside `spawn_blocking` - there is
//! no shared connection and no in-process lock. WAL journaling lets
//! readers and writers coexist; a 30 second busy timeout covers ordinary
//! lock waits. On top of that, `write`/`insert` retry up to 5 times with
//! a fixed 100 ms async delay, but only when SQLite reports lock
//! contention; any other failure propagates immediately.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, Row};
use tracing::{debug, info, warn};

use crate::error::ServiceFixError;

/// Write retry budget under lock contention
const WRITE_ATTEMPTS: usize = 5;

/// Fixed delay between contended write attempts
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// How long a connection waits on a lock before reporting busy
const BUSY_TIMEOUT_MS: u64 = 30_000;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS tickets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL,
    appliance TEXT,
    issue_summary TEXT,
    location TEXT,
    preferred_time TEXT,
    raw_problem_text TEXT,
    status TEXT DEFAULT 'new',
    technician_id INTEGER,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (technician_id) REFERENCES technicians (id)
);
CREATE TABLE IF NOT EXISTS technicians (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER UNIQUE NOT NULL,
    name TEXT,
    phone TEXT,
    skills TEXT,
    status TEXT DEFAULT 'pending',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL,
    rating INTEGER,
    comment TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (ticket_id) REFERENCES tickets (id)
);
";

/// Handle to the shared store. Cheap to clone; holds no connection.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
    busy_timeout_ms: u64,
}

impl Db {
    /// Open (creating if needed) the database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ServiceFixError> {
        Self::open_with_busy_timeout(path, BUSY_TIMEOUT_MS).await
    }

    /// Same as [`Db::open`] with a custom lock-wait ceiling. The tests use
    /// a tiny timeout to force the retry path.
    pub async fn open_with_busy_timeout(
        path: impl AsRef<Path>,
        busy_timeout_ms: u64,
    ) -> Result<Self, ServiceFixError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let db = Self {
            path,
            busy_timeout_ms,
        };

        let init = db.clone();
        tokio::task::spawn_blocking(move || -> Result<(), ServiceFixError> {
            let conn = init.connect()?;
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        })
        .await??;

        info!("Store ready at {}", db.path.display());
        Ok(db)
    }

    /// Open a fresh connection with the concurrency pragmas applied.
    fn connect(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(&self.path)?;
        // Readers never block writers and vice versa
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        Ok(conn)
    }

    /// Execute an INSERT/UPDATE statement. Returns the number of affected
    /// rows. Retries on lock contention only.
    pub async fn write(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<usize, ServiceFixError> {
        let sql = sql.into();
        self.write_inner(sql, params, |conn, sql, params| {
            conn.execute(sql, params_from_iter(params.iter()))
        })
        .await
    }

    /// Execute an INSERT statement and return the generated rowid. Same
    /// retry behavior as [`Db::write`].
    pub async fn insert(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<i64, ServiceFixError> {
        let sql = sql.into();
        self.write_inner(sql, params, |conn, sql, params| {
            conn.execute(sql, params_from_iter(params.iter()))?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn write_inner<T, F>(
        &self,
        sql: String,
        params: Vec<Value>,
        run: F,
    ) -> Result<T, ServiceFixError>
    where
        T: Send + 'static,
        F: Fn(&Connection, &str, &[Value]) -> Result<T, rusqlite::Error>
            + Send
            + Sync
            + Clone
            + 'static,
    {
        for attempt in 1..=WRITE_ATTEMPTS {
            let db = self.clone();
            let sql_task = sql.clone();
            let params_task = params.clone();
            let run_task = run.clone();

            let result = tokio::task::spawn_blocking(move || {
                let conn = db.connect()?;
                run_task(&conn, &sql_task, &params_task)
            })
            .await?;

            match result {
                Ok(value) => return Ok(value),
                Err(err) if is_locked(&err) => {
                    warn!(
                        "Store locked on write (attempt {attempt}/{WRITE_ATTEMPTS}), retrying"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(err) if is_unique_violation(&err) => {
                    return Err(ServiceFixError::Duplicate(err.to_string()));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ServiceFixError::Contention(WRITE_ATTEMPTS))
    }

    /// Run a query expected to yield zero or one row.
    pub async fn read_one<T, F>(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
        map: F,
    ) -> Result<Option<T>, ServiceFixError>
    where
        T: Send + 'static,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = self.clone();
        let sql = sql.into();
        tokio::task::spawn_blocking(move || {
            let conn = db.connect()?;
            match conn.query_row(&sql, params_from_iter(params.iter()), map) {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(err.into()),
            }
        })
        .await?
    }

    /// Run a query yielding any number of rows, in query order.
    pub async fn read_all<T, F>(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
        map: F,
    ) -> Result<Vec<T>, ServiceFixError>
    where
        T: Send + 'static,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = self.clone();
        let sql = sql.into();
        tokio::task::spawn_blocking(move || {
            let conn = db.connect()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), map)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            debug!("read_all: {} rows", out.len());
            Ok(out)
        })
        .await?
    }
}

fn is_locked(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
    )
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
        && err.to_string().contains("UNIQUE")
}
