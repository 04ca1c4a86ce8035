//! Error types for ServiceFix.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceFixError {
    /// A write kept hitting lock contention and the retry budget ran out.
    #[error("store contention: write failed after {0} attempts")]
    Contention(usize),

    /// A UNIQUE constraint fired (duplicate technician registration).
    #[error("duplicate row: {0}")]
    Duplicate(String),

    #[error("ticket not found")]
    TicketNotFound,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
