//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for NoteAI core.
//! - Apply schema migrations in deterministic order.
//! - Share one migrated connection between repositories and worker threads.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - A shared connection is only borrowed for one statement batch or
//!   transaction at a time.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A thread panicked while holding the shared connection.
    ConnectionPoisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::ConnectionPoisoned => write!(f, "shared database connection is poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::ConnectionPoisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Cloneable handle to one migrated SQLite connection.
///
/// Repositories hold a clone each; the versioning services run commits on
/// blocking worker threads through the same handle.
#[derive(Clone)]
pub struct SharedConnection {
    inner: Arc<Mutex<Connection>>,
}

impl SharedConnection {
    /// Wraps a connection returned by [`open_db`] or [`open_db_in_memory`].
    pub fn new(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// # Errors
    /// - `DbError::ConnectionPoisoned` when a previous holder panicked.
    /// - Whatever `f` returns.
    pub fn with<T, E>(&self, f: impl FnOnce(&mut Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| E::from(DbError::ConnectionPoisoned))?;
        f(&mut guard)
    }
}

impl std::fmt::Debug for SharedConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConnection").finish_non_exhaustive()
    }
}
