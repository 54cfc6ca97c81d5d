//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create notes together with their initial snapshot.
//! - Provide owner-scoped list reads (tag/status filters, sort) and
//!   single-note reads.
//! - Update unversioned note metadata and soft-delete notes.
//!
//! # Invariants
//! - All note reads and writes are constrained to the owner and
//!   `is_deleted = 0`.
//! - Creation commits snapshot version 1 (`manual`) in the same transaction.
//! - Content is never updated here; updates go through the version store.
//! - Stored tags are already normalized by the caller.

use crate::db::SharedConnection;
use crate::model::note::{Note, NoteId, NoteStatus, OwnerId};
use crate::model::version::ChangeType;
use crate::repo::version_repo::append_snapshot_in_tx;
use crate::repo::{ensure_tables, now_epoch_ms, parse_uuid, version_from_db, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

const NOTES_DEFAULT_LIMIT: u32 = 20;
const NOTES_LIMIT_MAX: u32 = 100;

const NOTE_SELECT_SQL: &str = "SELECT
    uuid,
    owner_uuid,
    title,
    content,
    rendered_text,
    status,
    is_public,
    is_favorite,
    word_count,
    reading_minutes,
    current_version,
    created_at,
    updated_at
FROM notes";

/// Sort key for note lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteSort {
    #[default]
    UpdatedAt,
    CreatedAt,
    Title,
}

impl NoteSort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpdatedAt => "updated_at",
            Self::CreatedAt => "created_at",
            Self::Title => "title",
        }
    }

    fn order_expr(self) -> &'static str {
        match self {
            Self::UpdatedAt => "updated_at",
            Self::CreatedAt => "created_at",
            Self::Title => "title COLLATE NOCASE",
        }
    }
}

impl Display for NoteSort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "updated_at" | "updated" => Ok(Self::UpdatedAt),
            "created_at" | "created" => Ok(Self::CreatedAt),
            "title" => Ok(Self::Title),
            _ => Err(format!(
                "unknown sort key `{value}`; expected updated_at|created_at|title"
            )),
        }
    }
}

/// Sort direction for note lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(format!("unknown sort order `{value}`; expected asc|desc")),
        }
    }
}

/// Input for note creation. `title` and `tags` must already be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub owner_id: OwnerId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_public: bool,
}

/// Partial metadata update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteMetaPatch {
    pub title: Option<String>,
    /// Replaces the whole tag set when present.
    pub tags: Option<Vec<String>>,
    pub status: Option<NoteStatus>,
    pub is_public: Option<bool>,
    pub is_favorite: Option<bool>,
}

impl NoteMetaPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.tags.is_none()
            && self.status.is_none()
            && self.is_public.is_none()
            && self.is_favorite.is_none()
    }
}

/// Query options for owner-scoped note lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteListQuery {
    pub owner_id: OwnerId,
    /// Notes carrying any of these tags. Empty means no tag filter.
    pub tags: Vec<String>,
    pub status: Option<NoteStatus>,
    pub sort: NoteSort,
    pub order: SortOrder,
    /// Maximum rows to return. Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

impl NoteListQuery {
    /// Unfiltered query, most recently edited first.
    pub fn for_owner(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            tags: Vec::new(),
            status: None,
            sort: NoteSort::default(),
            order: SortOrder::default(),
            limit: None,
            offset: 0,
        }
    }
}

/// Repository interface for note records.
pub trait NoteRepository {
    /// Creates a note and its first snapshot, returning the stored record.
    fn create_note(&self, note: &NewNote) -> RepoResult<Note>;
    /// Gets one active note owned by `owner_id`.
    fn get_note(&self, owner_id: OwnerId, note_id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists one owner's active notes.
    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>>;
    /// Applies a metadata patch without creating a snapshot.
    fn update_note_meta(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        patch: &NoteMetaPatch,
    ) -> RepoResult<Note>;
    /// Tombstones a note. Its history stays in storage.
    fn soft_delete_note(&self, owner_id: OwnerId, note_id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed note repository.
#[derive(Debug, Clone)]
pub struct SqliteNoteRepository {
    conn: SharedConnection,
}

impl SqliteNoteRepository {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        conn.with(|conn| ensure_tables(conn, &["notes", "note_versions", "note_tags"]))?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn create_note(&self, note: &NewNote) -> RepoResult<Note> {
        let note_id = Uuid::new_v4();
        self.conn.with(|conn| -> RepoResult<Note> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = now_epoch_ms();
            tx.execute(
                "INSERT INTO notes (
                    uuid,
                    owner_uuid,
                    title,
                    content,
                    is_public,
                    current_version,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, '', ?4, 0, ?5, ?5);",
                params![
                    note_id.to_string(),
                    note.owner_id.to_string(),
                    note.title,
                    note.is_public,
                    now
                ],
            )?;
            replace_tags_in_tx(&tx, note_id, &note.tags)?;
            append_snapshot_in_tx(&tx, note_id, 0, &note.content, ChangeType::Manual)?;
            tx.commit()?;

            load_note(conn, note.owner_id, note_id)?.ok_or(RepoError::NoteNotFound(note_id))
        })
    }

    fn get_note(&self, owner_id: OwnerId, note_id: NoteId) -> RepoResult<Option<Note>> {
        self.conn
            .with(|conn| -> RepoResult<Option<Note>> { load_note(conn, owner_id, note_id) })
    }

    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>> {
        let mut sql = format!(
            "{NOTE_SELECT_SQL}
             WHERE owner_uuid = ?
               AND is_deleted = 0"
        );
        let mut bind_values: Vec<Value> = vec![Value::Text(query.owner_id.to_string())];

        if !query.tags.is_empty() {
            let placeholders = vec!["?"; query.tags.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1
                    FROM note_tags nt
                    WHERE nt.note_uuid = notes.uuid
                      AND nt.tag IN ({placeholders})
                )"
            ));
            bind_values.extend(query.tags.iter().cloned().map(Value::Text));
        }

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }

        sql.push_str(&format!(
            " ORDER BY {} {}, uuid ASC LIMIT ? OFFSET ?",
            query.sort.order_expr(),
            query.order.keyword()
        ));
        bind_values.push(Value::Integer(i64::from(normalize_note_limit(query.limit))));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        self.conn.with(|conn| -> RepoResult<Vec<Note>> {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut notes = Vec::new();
            while let Some(row) = rows.next()? {
                notes.push(parse_note_row(conn, row)?);
            }
            Ok(notes)
        })
    }

    fn update_note_meta(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        patch: &NoteMetaPatch,
    ) -> RepoResult<Note> {
        self.conn.with(|conn| -> RepoResult<Note> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let changed = tx.execute(
                "UPDATE notes
                 SET
                    title = COALESCE(?3, title),
                    status = COALESCE(?4, status),
                    is_public = COALESCE(?5, is_public),
                    is_favorite = COALESCE(?6, is_favorite),
                    updated_at = ?7
                 WHERE uuid = ?1
                   AND owner_uuid = ?2
                   AND is_deleted = 0;",
                params![
                    note_id.to_string(),
                    owner_id.to_string(),
                    patch.title.as_deref(),
                    patch.status.map(NoteStatus::as_str),
                    patch.is_public,
                    patch.is_favorite,
                    now_epoch_ms(),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NoteNotFound(note_id));
            }
            if let Some(tags) = patch.tags.as_ref() {
                replace_tags_in_tx(&tx, note_id, tags)?;
            }
            tx.commit()?;

            load_note(conn, owner_id, note_id)?.ok_or(RepoError::NoteNotFound(note_id))
        })
    }

    fn soft_delete_note(&self, owner_id: OwnerId, note_id: NoteId) -> RepoResult<()> {
        self.conn.with(|conn| -> RepoResult<()> {
            let changed = conn.execute(
                "UPDATE notes
                 SET
                    is_deleted = 1,
                    updated_at = ?3
                 WHERE uuid = ?1
                   AND owner_uuid = ?2
                   AND is_deleted = 0;",
                params![note_id.to_string(), owner_id.to_string(), now_epoch_ms()],
            )?;
            if changed == 0 {
                return Err(RepoError::NoteNotFound(note_id));
            }
            Ok(())
        })
    }
}

/// Normalizes list limit according to notes contract.
pub fn normalize_note_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => NOTES_DEFAULT_LIMIT,
        Some(value) => value.min(NOTES_LIMIT_MAX),
    }
}

fn replace_tags_in_tx(tx: &Transaction<'_>, note_id: NoteId, tags: &[String]) -> RepoResult<()> {
    let note_text = note_id.to_string();
    tx.execute(
        "DELETE FROM note_tags WHERE note_uuid = ?1;",
        [note_text.as_str()],
    )?;
    for tag in tags {
        tx.execute(
            "INSERT OR IGNORE INTO note_tags (note_uuid, tag) VALUES (?1, ?2);",
            params![note_text.as_str(), tag.as_str()],
        )?;
    }
    Ok(())
}

fn load_tags_for_note(conn: &Connection, note_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tag
         FROM note_tags
         WHERE note_uuid = ?1
         ORDER BY tag ASC;",
    )?;
    let mut rows = stmt.query([note_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get(0)?);
    }
    Ok(tags)
}

fn load_note(conn: &Connection, owner_id: OwnerId, note_id: NoteId) -> RepoResult<Option<Note>> {
    let mut stmt = conn.prepare(&format!(
        "{NOTE_SELECT_SQL}
         WHERE uuid = ?1
           AND owner_uuid = ?2
           AND is_deleted = 0;"
    ))?;
    let mut rows = stmt.query([note_id.to_string(), owner_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_note_row(conn, row)?));
    }
    Ok(None)
}

fn parse_note_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("uuid")?;
    let owner_text: String = row.get("owner_uuid")?;
    let status_text: String = row.get("status")?;
    let status = NoteStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in notes.status"))
    })?;
    let tags = load_tags_for_note(conn, &id_text)?;

    Ok(Note {
        id: parse_uuid(&id_text, "notes.uuid")?,
        owner_id: parse_uuid(&owner_text, "notes.owner_uuid")?,
        title: row.get("title")?,
        content: row.get("content")?,
        rendered_text: row.get("rendered_text")?,
        tags,
        status,
        is_public: row.get("is_public")?,
        is_favorite: row.get("is_favorite")?,
        word_count: row.get("word_count")?,
        reading_minutes: row.get("reading_minutes")?,
        current_version: version_from_db(row.get("current_version")?, "notes.current_version")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
