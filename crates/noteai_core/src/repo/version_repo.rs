//! Version store contract and SQLite implementation.
//!
//! # Responsibility
//! - Append content snapshots and advance `notes.current_version` atomically.
//! - Enforce the per-note retention bound inside the commit transaction.
//! - Serve newest-first history reads.
//!
//! # Invariants
//! - Every call is scoped to the owning user; other owners see
//!   `NoteNotFound`.
//! - A commit only lands when the note is still at the caller's expected
//!   version, checked inside the same IMMEDIATE transaction that writes
//!   `expected + 1`. This holds across connections and processes.
//! - The newest snapshot is never pruned.
//! - Pruning removes non-manual snapshots (oldest first) before manual ones.

use crate::db::SharedConnection;
use crate::model::note::{NoteId, NotePreview, OwnerId, VersionNumber};
use crate::model::version::{ChangeType, SnapshotId, VersionSnapshot};
use crate::repo::{
    ensure_tables, now_epoch_ms, parse_uuid, version_from_db, version_to_db, RepoError,
    RepoResult,
};
use log::debug;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::num::NonZeroUsize;
use uuid::Uuid;

const SNAPSHOT_SELECT_SQL: &str = "SELECT
    uuid,
    note_uuid,
    version,
    content,
    change_type,
    created_at
FROM note_versions";

/// Current committed state of one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteHead {
    pub note_id: NoteId,
    pub version: VersionNumber,
    pub content: String,
}

/// Append-only snapshot storage.
pub trait VersionStore: Send + Sync {
    /// Reads the current version and content of an active note.
    fn load_head(&self, owner_id: OwnerId, note_id: NoteId) -> RepoResult<NoteHead>;
    /// Appends `expected + 1` with `content` if the note is still at
    /// `expected`.
    ///
    /// # Errors
    /// - `RepoError::VersionMismatch` when the note's version differs from
    ///   `expected`; nothing is written.
    fn commit(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        expected: VersionNumber,
        content: &str,
        change_type: ChangeType,
    ) -> RepoResult<VersionSnapshot>;
    /// Lists retained snapshots newest-first, capped at the retention bound.
    fn list_versions(&self, owner_id: OwnerId, note_id: NoteId)
        -> RepoResult<Vec<VersionSnapshot>>;
    /// Reads one snapshot that belongs to `note_id`.
    fn get_snapshot(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        snapshot_id: SnapshotId,
    ) -> RepoResult<VersionSnapshot>;
}

/// SQLite-backed version store.
#[derive(Debug, Clone)]
pub struct SqliteVersionStore {
    conn: SharedConnection,
    retention_limit: NonZeroUsize,
}

impl SqliteVersionStore {
    /// Constructs a store over a migrated connection.
    ///
    /// # Errors
    /// - `RepoError::MissingRequiredTable` when migrations were not applied.
    pub fn try_new(conn: SharedConnection, retention_limit: NonZeroUsize) -> RepoResult<Self> {
        conn.with(|conn| ensure_tables(conn, &["notes", "note_versions"]))?;
        Ok(Self {
            conn,
            retention_limit,
        })
    }

    /// Maximum number of snapshots kept per note.
    pub fn retention_limit(&self) -> NonZeroUsize {
        self.retention_limit
    }
}

impl VersionStore for SqliteVersionStore {
    fn load_head(&self, owner_id: OwnerId, note_id: NoteId) -> RepoResult<NoteHead> {
        self.conn.with(|conn| -> RepoResult<NoteHead> {
            let tx = conn.transaction()?;
            head_in_tx(&tx, owner_id, note_id)
        })
    }

    fn commit(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        expected: VersionNumber,
        content: &str,
        change_type: ChangeType,
    ) -> RepoResult<VersionSnapshot> {
        self.conn.with(|conn| -> RepoResult<VersionSnapshot> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let head = head_in_tx(&tx, owner_id, note_id)?;
            if head.version != expected {
                return Err(RepoError::VersionMismatch {
                    note_id,
                    expected,
                    current: head.version,
                    current_content: head.content,
                });
            }

            let snapshot = append_snapshot_in_tx(&tx, note_id, expected, content, change_type)?;
            let pruned = prune_in_tx(&tx, note_id, snapshot.version, self.retention_limit)?;
            tx.commit()?;

            debug!(
                "event=version_commit module=repo status=ok note_id={} version={} change_type={} content_len={} pruned={}",
                note_id,
                snapshot.version,
                change_type,
                content.len(),
                pruned
            );
            Ok(snapshot)
        })
    }

    fn list_versions(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
    ) -> RepoResult<Vec<VersionSnapshot>> {
        let limit = i64::try_from(self.retention_limit.get()).unwrap_or(i64::MAX);
        self.conn.with(|conn| -> RepoResult<Vec<VersionSnapshot>> {
            let tx = conn.transaction()?;
            head_in_tx(&tx, owner_id, note_id)?;

            let mut stmt = tx.prepare(&format!(
                "{SNAPSHOT_SELECT_SQL}
                 WHERE note_uuid = ?1
                 ORDER BY version DESC
                 LIMIT ?2;"
            ))?;
            let mut rows = stmt.query(params![note_id.to_string(), limit])?;
            let mut snapshots = Vec::new();
            while let Some(row) = rows.next()? {
                snapshots.push(parse_snapshot_row(row)?);
            }
            Ok(snapshots)
        })
    }

    fn get_snapshot(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        snapshot_id: SnapshotId,
    ) -> RepoResult<VersionSnapshot> {
        self.conn.with(|conn| -> RepoResult<VersionSnapshot> {
            let tx = conn.transaction()?;
            head_in_tx(&tx, owner_id, note_id)?;

            let mut stmt = tx.prepare(&format!(
                "{SNAPSHOT_SELECT_SQL}
                 WHERE uuid = ?1
                   AND note_uuid = ?2;"
            ))?;
            let mut rows = stmt.query(params![snapshot_id.to_string(), note_id.to_string()])?;
            if let Some(row) = rows.next()? {
                return parse_snapshot_row(row);
            }
            Err(RepoError::SnapshotNotFound(snapshot_id))
        })
    }
}

/// Reads the head of an active note owned by `owner_id` inside `tx`.
fn head_in_tx(tx: &Transaction<'_>, owner_id: OwnerId, note_id: NoteId) -> RepoResult<NoteHead> {
    let head = tx
        .query_row(
            "SELECT current_version, content
             FROM notes
             WHERE uuid = ?1
               AND owner_uuid = ?2
               AND is_deleted = 0;",
            params![note_id.to_string(), owner_id.to_string()],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    let (version, content) = head.ok_or(RepoError::NoteNotFound(note_id))?;
    Ok(NoteHead {
        note_id,
        version: version_from_db(version, "notes.current_version")?,
        content,
    })
}

/// Inserts snapshot `current + 1` and mirrors it onto the note row.
///
/// The note row is only updated while it still sits at `current`.
pub(crate) fn append_snapshot_in_tx(
    tx: &Transaction<'_>,
    note_id: NoteId,
    current: VersionNumber,
    content: &str,
    change_type: ChangeType,
) -> RepoResult<VersionSnapshot> {
    let next = current
        .checked_add(1)
        .ok_or_else(|| RepoError::InvalidData(format!("version overflow for note {note_id}")))?;
    let snapshot = VersionSnapshot {
        id: Uuid::new_v4(),
        note_id,
        version: next,
        content: content.to_string(),
        change_type,
        created_at: now_epoch_ms(),
    };
    let preview = NotePreview::derive(content);

    let changed = tx.execute(
        "UPDATE notes
         SET
            content = ?2,
            rendered_text = ?3,
            word_count = ?4,
            reading_minutes = ?5,
            current_version = ?6,
            updated_at = ?7
         WHERE uuid = ?1
           AND current_version = ?8
           AND is_deleted = 0;",
        params![
            note_id.to_string(),
            content,
            preview.rendered_text.as_deref(),
            preview.word_count,
            preview.reading_minutes,
            version_to_db(next)?,
            snapshot.created_at,
            version_to_db(current)?,
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NoteNotFound(note_id));
    }

    tx.execute(
        "INSERT INTO note_versions (
            uuid,
            note_uuid,
            version,
            content,
            change_type,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            snapshot.id.to_string(),
            note_id.to_string(),
            version_to_db(next)?,
            content,
            change_type.as_str(),
            snapshot.created_at,
        ],
    )?;

    Ok(snapshot)
}

/// Deletes snapshots beyond `limit`, returning how many were removed.
fn prune_in_tx(
    tx: &Transaction<'_>,
    note_id: NoteId,
    newest: VersionNumber,
    limit: NonZeroUsize,
) -> RepoResult<usize> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM note_versions WHERE note_uuid = ?1;",
        [note_id.to_string()],
        |row| row.get(0),
    )?;
    let limit = i64::try_from(limit.get()).unwrap_or(i64::MAX);
    let excess = count - limit;
    if excess <= 0 {
        return Ok(0);
    }

    let removed = tx.execute(
        "DELETE FROM note_versions
         WHERE uuid IN (
            SELECT uuid
            FROM note_versions
            WHERE note_uuid = ?1
              AND version < ?2
            ORDER BY
                CASE change_type WHEN 'manual' THEN 1 ELSE 0 END ASC,
                version ASC
            LIMIT ?3
         );",
        params![note_id.to_string(), version_to_db(newest)?, excess],
    )?;
    Ok(removed)
}

fn parse_snapshot_row(row: &Row<'_>) -> RepoResult<VersionSnapshot> {
    let id_text: String = row.get("uuid")?;
    let note_text: String = row.get("note_uuid")?;
    let change_text: String = row.get("change_type")?;
    let change_type = ChangeType::parse(&change_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid change type `{change_text}` in note_versions.change_type"
        ))
    })?;

    Ok(VersionSnapshot {
        id: parse_uuid(&id_text, "note_versions.uuid")?,
        note_id: parse_uuid(&note_text, "note_versions.note_uuid")?,
        version: version_from_db(row.get("version")?, "note_versions.version")?,
        content: row.get("content")?,
        change_type,
        created_at: row.get("created_at")?,
    })
}
