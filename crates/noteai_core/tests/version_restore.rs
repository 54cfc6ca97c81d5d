mod common;

use common::fixture;
use noteai_core::{ChangeType, NoteLocks, SaveError, VersionHistory, VersionStore};
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn restore_commits_source_content_as_next_manual_version() {
    let fx = fixture(10);
    let note = fx.create_note("original");
    fx.store
        .commit(fx.owner, note.id, 1, "rewrite", ChangeType::AutoSave)
        .unwrap();
    let history = VersionHistory::new(Arc::new(fx.store.clone()), NoteLocks::new());
    let source = history
        .list_versions(fx.owner, note.id)
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(source.version, 1);

    let receipt = history.restore(fx.owner, note.id, source.id, false).unwrap();

    assert_eq!(receipt.source, source.id);
    assert!(receipt.backup.is_none());
    assert_eq!(receipt.restored.version, 3);
    assert_eq!(receipt.restored.change_type, ChangeType::Manual);
    let head = fx.store.load_head(fx.owner, note.id).unwrap();
    assert_eq!((head.version, head.content.as_str()), (3, "original"));

    let untouched = history.get_snapshot(fx.owner, note.id, source.id).unwrap();
    assert_eq!(untouched, source);
}

#[test]
fn restore_with_backup_snapshots_current_content_first() {
    let fx = fixture(10);
    let note = fx.create_note("original");
    fx.store
        .commit(fx.owner, note.id, 1, "unsaved thoughts", ChangeType::AutoSave)
        .unwrap();
    let history = VersionHistory::new(Arc::new(fx.store.clone()), NoteLocks::new());
    let source = history
        .list_versions(fx.owner, note.id)
        .unwrap()
        .pop()
        .unwrap();

    let receipt = history.restore(fx.owner, note.id, source.id, true).unwrap();

    let backup = receipt.backup.unwrap();
    assert_eq!(backup.version, 3);
    assert_eq!(backup.change_type, ChangeType::Manual);
    assert_eq!(receipt.restored.version, 4);

    let contents: Vec<_> = history
        .list_versions(fx.owner, note.id)
        .unwrap()
        .into_iter()
        .map(|snapshot| snapshot.content)
        .collect();
    assert_eq!(
        contents,
        vec!["original", "unsaved thoughts", "unsaved thoughts", "original"]
    );
}

#[test]
fn restore_of_unknown_snapshot_is_rejected_without_writing() {
    let fx = fixture(10);
    let note = fx.create_note("only");
    let history = VersionHistory::new(Arc::new(fx.store.clone()), NoteLocks::new());

    let err = history
        .restore(fx.owner, note.id, Uuid::new_v4(), true)
        .unwrap_err();
    assert!(matches!(err, SaveError::SnapshotNotFound(_)));
    assert_eq!(fx.store.load_head(fx.owner, note.id).unwrap().version, 1);
}

#[test]
fn foreign_owner_cannot_read_or_restore_history() {
    let fx = fixture(10);
    let note = fx.create_note("original");
    fx.store
        .commit(fx.owner, note.id, 1, "current", ChangeType::Manual)
        .unwrap();
    let history = VersionHistory::new(Arc::new(fx.store.clone()), NoteLocks::new());
    let source = history
        .list_versions(fx.owner, note.id)
        .unwrap()
        .pop()
        .unwrap();
    let stranger = Uuid::new_v4();

    assert!(matches!(
        history.list_versions(stranger, note.id),
        Err(SaveError::NoteNotFound(_))
    ));
    assert!(matches!(
        history.get_snapshot(stranger, note.id, source.id),
        Err(SaveError::NoteNotFound(_))
    ));
    assert!(matches!(
        history.restore(stranger, note.id, source.id, true),
        Err(SaveError::NoteNotFound(_))
    ));

    let head = fx.store.load_head(fx.owner, note.id).unwrap();
    assert_eq!((head.version, head.content.as_str()), (2, "current"));
}
