//! Core domain logic for NoteAI note versioning.
//! This crate is the single source of truth for version and save invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError, LoggingConfig, VersioningConfig};
pub use db::{open_db, open_db_in_memory, DbError, SharedConnection};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::note::{
    normalize_tag, normalize_tags, normalize_title, Note, NoteId, NotePreview, NoteStatus,
    OwnerId, VersionNumber,
};
pub use model::version::{ChangeType, SnapshotId, VersionSnapshot};
pub use repo::note_repo::{
    NewNote, NoteListQuery, NoteMetaPatch, NoteRepository, NoteSort, SortOrder,
    SqliteNoteRepository,
};
pub use repo::version_repo::{NoteHead, SqliteVersionStore, VersionStore};
pub use repo::{RepoError, RepoResult};
pub use service::autosave::{
    AutoSaveOutcome, AutoSaveScheduler, PendingAutoSave, PipelineState, SaveTicket,
};
pub use service::conflict::{ConflictDetector, SaveError, SaveReceipt};
pub use service::history::{RestoreReceipt, VersionHistory};
pub use service::manager::NoteVersioning;
pub use service::note_locks::NoteLocks;
pub use service::note_service::{NoteService, NoteServiceError, NotesListResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
