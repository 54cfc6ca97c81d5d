//! Optimistic write path with lost-update detection.
//!
//! # Responsibility
//! - Commit writes through the version store only when the client's base
//!   version is still the committed version.
//! - Surface rejections as explicit `SaveError` values.
//!
//! # Invariants
//! - The version compare happens inside the store's commit transaction, so
//!   writers in other processes cannot slip in between check and write.
//! - Writers in this process are additionally serialized per note by
//!   `NoteLocks`.
//! - A rejected write leaves the note untouched.
//! - Writes are scoped to the note's owner.
//! - No write is retried here.

use crate::model::note::{NoteId, OwnerId, VersionNumber};
use crate::model::version::{ChangeType, SnapshotId, VersionSnapshot};
use crate::repo::version_repo::VersionStore;
use crate::repo::RepoError;
use crate::service::note_locks::NoteLocks;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Result of an accepted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub note_id: NoteId,
    pub snapshot_id: SnapshotId,
    /// Version the note is now at.
    pub version: VersionNumber,
    pub change_type: ChangeType,
    /// Epoch milliseconds.
    pub committed_at: i64,
}

impl From<VersionSnapshot> for SaveReceipt {
    fn from(value: VersionSnapshot) -> Self {
        Self {
            note_id: value.note_id,
            snapshot_id: value.id,
            version: value.version,
            change_type: value.change_type,
            committed_at: value.created_at,
        }
    }
}

/// Why a write was not applied.
#[derive(Debug)]
pub enum SaveError {
    /// The client edited an older version. Re-fetch and retry.
    VersionConflict {
        note_id: NoteId,
        client_version: VersionNumber,
        current_version: VersionNumber,
        current_content: String,
    },
    /// The client claims a version the server never committed.
    ProtocolError {
        note_id: NoteId,
        client_version: VersionNumber,
        server_version: VersionNumber,
    },
    /// Storage rejected the read or write.
    StorageFailure(RepoError),
    /// Note does not exist or is soft-deleted.
    NoteNotFound(NoteId),
    /// Snapshot does not exist for the note (or was pruned).
    SnapshotNotFound(SnapshotId),
}

impl SaveError {
    /// Stable short code for logs and UI status mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::VersionConflict { .. } => "version_conflict",
            Self::ProtocolError { .. } => "protocol_error",
            Self::StorageFailure(_) => "storage_failure",
            Self::NoteNotFound(_) => "note_not_found",
            Self::SnapshotNotFound(_) => "snapshot_not_found",
        }
    }

    /// Whether the caller can recover by re-fetching and resubmitting.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VersionConflict {
                note_id,
                client_version,
                current_version,
                ..
            } => write!(
                f,
                "version conflict on note {note_id}: client edited v{client_version}, server is at v{current_version}"
            ),
            Self::ProtocolError {
                note_id,
                client_version,
                server_version,
            } => write!(
                f,
                "protocol error on note {note_id}: client version v{client_version} is ahead of server v{server_version}"
            ),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
            Self::NoteNotFound(note_id) => write!(f, "note not found: {note_id}"),
            Self::SnapshotNotFound(snapshot_id) => {
                write!(f, "version snapshot not found: {snapshot_id}")
            }
        }
    }
}

impl Error for SaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SaveError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NoteNotFound(note_id) => Self::NoteNotFound(note_id),
            RepoError::SnapshotNotFound(snapshot_id) => Self::SnapshotNotFound(snapshot_id),
            RepoError::VersionMismatch {
                note_id,
                expected,
                current,
                current_content,
            } => {
                if expected < current {
                    Self::VersionConflict {
                        note_id,
                        client_version: expected,
                        current_version: current,
                        current_content,
                    }
                } else {
                    Self::ProtocolError {
                        note_id,
                        client_version: expected,
                        server_version: current,
                    }
                }
            }
            other => Self::StorageFailure(other),
        }
    }
}

/// Version-checked writer shared by manual saves, auto-saves and
/// external optimizer results.
#[derive(Clone)]
pub struct ConflictDetector {
    store: Arc<dyn VersionStore>,
    locks: NoteLocks,
}

impl ConflictDetector {
    pub fn new(store: Arc<dyn VersionStore>, locks: NoteLocks) -> Self {
        Self { store, locks }
    }

    /// Commits `content` if `client_version` is the note's current version.
    ///
    /// # Errors
    /// - `VersionConflict` when the server already moved past `client_version`.
    /// - `ProtocolError` when `client_version` is ahead of the server.
    /// - `NoteNotFound` when the note is missing, deleted or owned by someone
    ///   else.
    /// - `StorageFailure` from the store.
    pub fn check_and_apply(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        content: &str,
        client_version: VersionNumber,
        change_type: ChangeType,
    ) -> Result<SaveReceipt, SaveError> {
        self.locks.with_note_lock(note_id, || -> Result<SaveReceipt, SaveError> {
            let result =
                self.store
                    .commit(owner_id, note_id, client_version, content, change_type);
            match result {
                Ok(snapshot) => {
                    info!(
                        "event=save_committed module=conflict status=ok note_id={} version={} change_type={}",
                        note_id, snapshot.version, change_type
                    );
                    Ok(SaveReceipt::from(snapshot))
                }
                Err(err) => {
                    let err = SaveError::from(err);
                    match &err {
                        SaveError::VersionConflict {
                            current_version, ..
                        } => info!(
                            "event=save_rejected module=conflict status=conflict note_id={} client_version={} current_version={} change_type={}",
                            note_id, client_version, current_version, change_type
                        ),
                        SaveError::ProtocolError { server_version, .. } => error!(
                            "event=save_rejected module=conflict status=error error_code=protocol_error note_id={} client_version={} server_version={}",
                            note_id, client_version, server_version
                        ),
                        other => warn!(
                            "event=save_failed module=conflict status=error error_code={} note_id={} client_version={} error={}",
                            other.code(),
                            note_id,
                            client_version,
                            other
                        ),
                    }
                    Err(err)
                }
            }
        })
    }
}
