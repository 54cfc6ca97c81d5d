//! Version history reads and restore.
//!
//! # Responsibility
//! - Expose newest-first history and single-snapshot reads.
//! - Restore an older snapshot by committing its content as a new version.
//!
//! # Invariants
//! - Restore never edits or removes the source snapshot.
//! - Restore (and its optional backup) runs under the note's lock, so it
//!   cannot interleave with a conflict-checked save.
//! - Each commit names the version it builds on; a concurrent writer in
//!   another process turns the restore into a `VersionConflict`.
//! - Every call is scoped to the note's owner.

use crate::model::note::{NoteId, OwnerId};
use crate::model::version::{ChangeType, SnapshotId, VersionSnapshot};
use crate::repo::version_repo::VersionStore;
use crate::service::conflict::{SaveError, SaveReceipt};
use crate::service::note_locks::NoteLocks;
use log::info;
use std::sync::Arc;

/// Outcome of a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReceipt {
    /// Snapshot whose content was restored.
    pub source: SnapshotId,
    /// Commit of the pre-restore content, when requested.
    pub backup: Option<SaveReceipt>,
    /// Commit carrying the restored content.
    pub restored: SaveReceipt,
}

/// History facade over a version store.
#[derive(Clone)]
pub struct VersionHistory {
    store: Arc<dyn VersionStore>,
    locks: NoteLocks,
}

impl VersionHistory {
    /// `locks` must be the registry shared with the `ConflictDetector`.
    pub fn new(store: Arc<dyn VersionStore>, locks: NoteLocks) -> Self {
        Self { store, locks }
    }

    /// Lists retained snapshots, newest first.
    pub fn list_versions(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
    ) -> Result<Vec<VersionSnapshot>, SaveError> {
        Ok(self.store.list_versions(owner_id, note_id)?)
    }

    /// Reads one retained snapshot of `note_id`.
    pub fn get_snapshot(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        snapshot_id: SnapshotId,
    ) -> Result<VersionSnapshot, SaveError> {
        Ok(self.store.get_snapshot(owner_id, note_id, snapshot_id)?)
    }

    /// Restores `snapshot_id` as the newest version of `note_id`.
    ///
    /// With `backup = true` the current content is first committed as its
    /// own `manual` snapshot, so the restored version is `current + 2`.
    pub fn restore(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        snapshot_id: SnapshotId,
        backup: bool,
    ) -> Result<RestoreReceipt, SaveError> {
        self.locks
            .with_note_lock(note_id, || -> Result<RestoreReceipt, SaveError> {
                let source = self.store.get_snapshot(owner_id, note_id, snapshot_id)?;
                let head = self.store.load_head(owner_id, note_id)?;

                let backup = if backup {
                    let snapshot = self.store.commit(
                        owner_id,
                        note_id,
                        head.version,
                        &head.content,
                        ChangeType::Manual,
                    )?;
                    Some(SaveReceipt::from(snapshot))
                } else {
                    None
                };

                let base = backup
                    .as_ref()
                    .map_or(head.version, |receipt| receipt.version);
                let restored = self.store.commit(
                    owner_id,
                    note_id,
                    base,
                    &source.content,
                    ChangeType::Manual,
                )?;
                info!(
                    "event=version_restore module=history status=ok note_id={} source_version={} version={} backup={}",
                    note_id,
                    source.version,
                    restored.version,
                    backup.is_some()
                );

                Ok(RestoreReceipt {
                    source: source.id,
                    backup,
                    restored: SaveReceipt::from(restored),
                })
            })
    }
}
