//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for notes and snapshots.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Every note write that changes content appends a snapshot in the same
//!   transaction.
//! - Repository APIs return semantic errors (`NoteNotFound`,
//!   `SnapshotNotFound`) in addition to DB transport errors.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::note::{NoteId, VersionNumber};
use crate::model::version::SnapshotId;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub mod note_repo;
pub mod version_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note and snapshot persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Note does not exist or is soft-deleted.
    NoteNotFound(NoteId),
    /// Snapshot does not exist for the given note (or was pruned).
    SnapshotNotFound(SnapshotId),
    /// The note moved past (or never reached) the version the write was
    /// based on. Carries the committed head at the time of the check.
    VersionMismatch {
        note_id: NoteId,
        expected: VersionNumber,
        current: VersionNumber,
        current_content: String,
    },
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::SnapshotNotFound(id) => write!(f, "version snapshot not found: {id}"),
            Self::VersionMismatch {
                note_id,
                expected,
                current,
                ..
            } => write!(
                f,
                "note {note_id} is at v{current}, write was based on v{expected}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; run migrations first")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn version_to_db(version: VersionNumber) -> RepoResult<i64> {
    i64::try_from(version)
        .map_err(|_| RepoError::InvalidData(format!("version {version} exceeds storage range")))
}

pub(crate) fn version_from_db(value: i64, column: &str) -> RepoResult<VersionNumber> {
    VersionNumber::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative version `{value}` in {column}")))
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [*table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
