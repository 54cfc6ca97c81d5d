//! Note use-case service.
//!
//! # Responsibility
//! - Provide owner-scoped create/get/list/update/delete APIs.
//! - Validate titles and normalize tags before they reach storage.
//! - Hide notes of other owners behind `NoteNotFound`.
//!
//! # Invariants
//! - Content changes after creation go through the versioning write path,
//!   never through this service.
//! - Metadata updates never create a snapshot.

use crate::model::note::{normalize_tag, normalize_tags, normalize_title, Note, NoteId, OwnerId};
use crate::repo::note_repo::{
    normalize_note_limit, NewNote, NoteListQuery, NoteMetaPatch, NoteRepository,
};
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Title is blank or longer than 200 characters.
    InvalidTitle(String),
    /// Metadata update carried no fields.
    EmptyPatch,
    /// Target note does not exist, is deleted, or belongs to someone else.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle(title) => write!(
                f,
                "invalid title `{title}`: must be 1..=200 characters after trimming"
            ),
            Self::EmptyPatch => write!(f, "metadata update has no fields to change"),
            Self::NoteNotFound(note_id) => write!(f, "note not found: {note_id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NoteNotFound(note_id) => Self::NoteNotFound(note_id),
            other => Self::Repo(other),
        }
    }
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesListResult {
    pub items: Vec<Note>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one note for `owner_id`; the note starts at version 1.
    pub fn create_note(
        &self,
        owner_id: OwnerId,
        title: &str,
        content: impl Into<String>,
        tags: &[String],
        is_public: bool,
    ) -> Result<Note, NoteServiceError> {
        let title = normalize_title(title)
            .ok_or_else(|| NoteServiceError::InvalidTitle(title.to_string()))?;
        let content = content.into();
        let note = self.repo.create_note(&NewNote {
            owner_id,
            title,
            content,
            tags: normalize_tags(tags),
            is_public,
        })?;
        info!(
            "event=note_create module=note_service status=ok note_id={} content_len={} tags={}",
            note.id,
            note.content.len(),
            note.tags.len()
        );
        Ok(note)
    }

    /// Gets one note visible to `owner_id`.
    pub fn get_note(&self, owner_id: OwnerId, note_id: NoteId) -> Result<Note, NoteServiceError> {
        self.repo
            .get_note(owner_id, note_id)?
            .ok_or(NoteServiceError::NoteNotFound(note_id))
    }

    /// Lists notes matching `query`; tag filters are normalized first.
    pub fn list_notes(&self, query: NoteListQuery) -> Result<NotesListResult, NoteServiceError> {
        let applied_limit = normalize_note_limit(query.limit);
        let tags = query
            .tags
            .iter()
            .filter_map(|tag| normalize_tag(tag))
            .collect();
        let items = self.repo.list_notes(&NoteListQuery {
            tags,
            limit: Some(applied_limit),
            ..query
        })?;
        Ok(NotesListResult {
            items,
            applied_limit,
        })
    }

    /// Updates title, tags, status or flags of a note owned by `owner_id`.
    pub fn update_note_meta(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        patch: NoteMetaPatch,
    ) -> Result<Note, NoteServiceError> {
        if patch.is_empty() {
            return Err(NoteServiceError::EmptyPatch);
        }
        let title = match patch.title {
            Some(title) => Some(
                normalize_title(&title).ok_or(NoteServiceError::InvalidTitle(title))?,
            ),
            None => None,
        };
        let patch = NoteMetaPatch {
            title,
            tags: patch.tags.as_deref().map(normalize_tags),
            ..patch
        };
        let note = self.repo.update_note_meta(owner_id, note_id, &patch)?;
        info!(
            "event=note_update_meta module=note_service status=ok note_id={} status_value={} tags={}",
            note.id,
            note.status,
            note.tags.len()
        );
        Ok(note)
    }

    /// Soft-deletes a note owned by `owner_id`.
    pub fn delete_note(&self, owner_id: OwnerId, note_id: NoteId) -> Result<(), NoteServiceError> {
        self.repo.soft_delete_note(owner_id, note_id)?;
        info!("event=note_delete module=note_service status=ok note_id={note_id}");
        Ok(())
    }
}
