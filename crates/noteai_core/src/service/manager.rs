//! Versioning facade.
//!
//! # Responsibility
//! - Wire the conflict detector, history and auto-save scheduler around one
//!   version store and one shared lock registry.
//! - Offer the entry points used by edit sessions: manual save, auto-save,
//!   optimizer write-back, history and restore.
//!
//! # Invariants
//! - Every entry point takes the acting owner; notes of other owners answer
//!   `NoteNotFound`.

use crate::config::{ConfigError, VersioningConfig};
use crate::model::note::{NoteId, OwnerId, VersionNumber};
use crate::model::version::{ChangeType, SnapshotId, VersionSnapshot};
use crate::repo::version_repo::VersionStore;
use crate::service::autosave::{AutoSaveScheduler, PipelineState, SaveTicket};
use crate::service::conflict::{ConflictDetector, SaveError, SaveReceipt};
use crate::service::history::{RestoreReceipt, VersionHistory};
use crate::service::note_locks::NoteLocks;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Note versioning and auto-save manager.
pub struct NoteVersioning {
    detector: ConflictDetector,
    history: VersionHistory,
    autosave: AutoSaveScheduler,
}

impl NoteVersioning {
    /// Builds the manager; auto-save timers are spawned on `runtime`.
    ///
    /// The store's own retention bound applies; `config` supplies debounce
    /// and TTL settings.
    pub fn new(
        store: Arc<dyn VersionStore>,
        config: &VersioningConfig,
        runtime: Handle,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let locks = NoteLocks::new();
        let detector = ConflictDetector::new(Arc::clone(&store), locks.clone());
        let history = VersionHistory::new(store, locks);
        let autosave = AutoSaveScheduler::new(
            detector.clone(),
            runtime,
            config.debounce_window(),
            config.pending_ttl(),
        );
        Ok(Self {
            detector,
            history,
            autosave,
        })
    }

    /// Explicit user save. Blocks on storage.
    pub fn save_manual(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        content: &str,
        client_version: VersionNumber,
    ) -> Result<SaveReceipt, SaveError> {
        self.detector.check_and_apply(
            owner_id,
            note_id,
            content,
            client_version,
            ChangeType::Manual,
        )
    }

    /// Writes back content produced by the external text optimizer.
    ///
    /// `base_version` is the version the optimizer read.
    pub fn apply_external_optimize(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        optimized_content: &str,
        base_version: VersionNumber,
    ) -> Result<SaveReceipt, SaveError> {
        self.detector.check_and_apply(
            owner_id,
            note_id,
            optimized_content,
            base_version,
            ChangeType::ExternalOptimize,
        )
    }

    /// Debounced auto-save; see `AutoSaveScheduler::schedule_save`.
    ///
    /// Ownership is checked when the save commits; a foreign owner's ticket
    /// resolves to `Failed(NoteNotFound)`.
    pub fn schedule_autosave(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        content: impl Into<String>,
        client_version: VersionNumber,
    ) -> SaveTicket {
        self.autosave
            .schedule_save(owner_id, note_id, content, client_version)
    }

    pub fn cancel_autosave(&self, owner_id: OwnerId, note_id: NoteId) -> bool {
        self.autosave.cancel(owner_id, note_id)
    }

    pub fn pipeline_state(&self, owner_id: OwnerId, note_id: NoteId) -> PipelineState {
        self.autosave.state(owner_id, note_id)
    }

    pub fn list_versions(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
    ) -> Result<Vec<VersionSnapshot>, SaveError> {
        self.history.list_versions(owner_id, note_id)
    }

    pub fn get_snapshot(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        snapshot_id: SnapshotId,
    ) -> Result<VersionSnapshot, SaveError> {
        self.history.get_snapshot(owner_id, note_id, snapshot_id)
    }

    pub fn restore(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        snapshot_id: SnapshotId,
        backup: bool,
    ) -> Result<RestoreReceipt, SaveError> {
        self.history.restore(owner_id, note_id, snapshot_id, backup)
    }

    pub fn autosave(&self) -> &AutoSaveScheduler {
        &self.autosave
    }
}
