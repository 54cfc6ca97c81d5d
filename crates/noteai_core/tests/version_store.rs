mod common;

use common::fixture;
use noteai_core::{
    open_db, ChangeType, NewNote, NoteRepository, RepoError, SharedConnection,
    SqliteNoteRepository, SqliteVersionStore, VersionStore,
};
use std::num::NonZeroUsize;
use uuid::Uuid;

#[test]
fn commits_increment_by_one_and_update_note_head() {
    let fx = fixture(10);
    let note = fx.create_note("v1");

    let second = fx
        .store
        .commit(fx.owner, note.id, 1, "v2", ChangeType::AutoSave)
        .unwrap();
    let third = fx
        .store
        .commit(fx.owner, note.id, 2, "v3", ChangeType::ExternalOptimize)
        .unwrap();

    assert_eq!(second.version, 2);
    assert_eq!(third.version, 3);
    let head = fx.store.load_head(fx.owner, note.id).unwrap();
    assert_eq!(head.version, 3);
    assert_eq!(head.content, "v3");
}

#[test]
fn commit_against_moved_head_writes_nothing() {
    let fx = fixture(10);
    let note = fx.create_note("v1");
    fx.store
        .commit(fx.owner, note.id, 1, "v2", ChangeType::Manual)
        .unwrap();

    let stale = fx
        .store
        .commit(fx.owner, note.id, 1, "stale", ChangeType::Manual)
        .unwrap_err();
    match stale {
        RepoError::VersionMismatch {
            expected,
            current,
            current_content,
            ..
        } => {
            assert_eq!(expected, 1);
            assert_eq!(current, 2);
            assert_eq!(current_content, "v2");
        }
        other => panic!("unexpected error: {other}"),
    }

    let ahead = fx
        .store
        .commit(fx.owner, note.id, 9, "ahead", ChangeType::Manual)
        .unwrap_err();
    assert!(matches!(
        ahead,
        RepoError::VersionMismatch {
            expected: 9,
            current: 2,
            ..
        }
    ));
    assert_eq!(fx.store.list_versions(fx.owner, note.id).unwrap().len(), 2);
}

#[test]
fn stale_commit_from_second_connection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let retention = NonZeroUsize::new(10).unwrap();
    let first_conn = SharedConnection::new(open_db(&path).unwrap());
    let second_conn = SharedConnection::new(open_db(&path).unwrap());
    let notes = SqliteNoteRepository::try_new(first_conn.clone()).unwrap();
    let first = SqliteVersionStore::try_new(first_conn, retention).unwrap();
    let second = SqliteVersionStore::try_new(second_conn, retention).unwrap();
    let owner = Uuid::new_v4();
    let note = notes
        .create_note(&NewNote {
            owner_id: owner,
            title: "Shared".to_string(),
            content: "base".to_string(),
            tags: Vec::new(),
            is_public: false,
        })
        .unwrap();

    // Both writers read v1; the second one lands first.
    let read_by_first = first.load_head(owner, note.id).unwrap();
    let read_by_second = second.load_head(owner, note.id).unwrap();
    second
        .commit(owner, note.id, read_by_second.version, "from second", ChangeType::Manual)
        .unwrap();

    let err = first
        .commit(owner, note.id, read_by_first.version, "from first", ChangeType::Manual)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::VersionMismatch {
            expected: 1,
            current: 2,
            ..
        }
    ));
    let head = first.load_head(owner, note.id).unwrap();
    assert_eq!(head.version, 2);
    assert_eq!(head.content, "from second");
}

#[test]
fn other_owner_sees_note_as_missing() {
    let fx = fixture(10);
    let note = fx.create_note("private");
    let snapshot = fx.store.list_versions(fx.owner, note.id).unwrap().remove(0);
    let stranger = Uuid::new_v4();

    assert!(matches!(
        fx.store.load_head(stranger, note.id),
        Err(RepoError::NoteNotFound(_))
    ));
    assert!(matches!(
        fx.store.commit(stranger, note.id, 1, "hijack", ChangeType::Manual),
        Err(RepoError::NoteNotFound(_))
    ));
    assert!(matches!(
        fx.store.list_versions(stranger, note.id),
        Err(RepoError::NoteNotFound(_))
    ));
    assert!(matches!(
        fx.store.get_snapshot(stranger, note.id, snapshot.id),
        Err(RepoError::NoteNotFound(_))
    ));
    assert_eq!(fx.store.load_head(fx.owner, note.id).unwrap().content, "private");
}

#[test]
fn list_versions_is_newest_first() {
    let fx = fixture(10);
    let note = fx.create_note("a");
    fx.store
        .commit(fx.owner, note.id, 1, "b", ChangeType::AutoSave)
        .unwrap();
    fx.store
        .commit(fx.owner, note.id, 2, "c", ChangeType::Manual)
        .unwrap();

    let history = fx.store.list_versions(fx.owner, note.id).unwrap();
    let versions: Vec<_> = history.iter().map(|snapshot| snapshot.version).collect();
    let contents: Vec<_> = history.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(versions, vec![3, 2, 1]);
    assert_eq!(contents, vec!["c", "b", "a"]);
}

#[test]
fn retention_never_exceeds_bound() {
    let fx = fixture(3);
    let note = fx.create_note("v1");
    for n in 2..=8 {
        fx.store
            .commit(fx.owner, note.id, n - 1, &format!("v{n}"), ChangeType::Manual)
            .unwrap();
        assert!(fx.store.list_versions(fx.owner, note.id).unwrap().len() <= 3);
    }

    let versions: Vec<_> = fx
        .store
        .list_versions(fx.owner, note.id)
        .unwrap()
        .iter()
        .map(|snapshot| snapshot.version)
        .collect();
    assert_eq!(versions, vec![8, 7, 6]);
}

#[test]
fn retention_prunes_auto_saves_before_manual_snapshots() {
    let fx = fixture(3);
    let note = fx.create_note("manual-1");
    fx.store
        .commit(fx.owner, note.id, 1, "auto-2", ChangeType::AutoSave)
        .unwrap();
    fx.store
        .commit(fx.owner, note.id, 2, "manual-3", ChangeType::Manual)
        .unwrap();
    fx.store
        .commit(fx.owner, note.id, 3, "auto-4", ChangeType::AutoSave)
        .unwrap();

    let versions: Vec<_> = fx
        .store
        .list_versions(fx.owner, note.id)
        .unwrap()
        .iter()
        .map(|snapshot| snapshot.version)
        .collect();
    assert_eq!(versions, vec![4, 3, 1]);
}

#[test]
fn newest_snapshot_survives_even_when_it_is_an_auto_save() {
    let fx = fixture(2);
    let note = fx.create_note("manual-1");
    fx.store
        .commit(fx.owner, note.id, 1, "manual-2", ChangeType::Manual)
        .unwrap();
    fx.store
        .commit(fx.owner, note.id, 2, "auto-3", ChangeType::AutoSave)
        .unwrap();

    let history = fx.store.list_versions(fx.owner, note.id).unwrap();
    let versions: Vec<_> = history.iter().map(|snapshot| snapshot.version).collect();
    assert_eq!(versions, vec![3, 2]);
    assert_eq!(history[0].change_type, ChangeType::AutoSave);
}

#[test]
fn get_snapshot_is_scoped_to_its_note() {
    let fx = fixture(10);
    let left = fx.create_note("left");
    let right = fx.create_note("right");
    let snapshot = fx.store.list_versions(fx.owner, left.id).unwrap().remove(0);

    let found = fx.store.get_snapshot(fx.owner, left.id, snapshot.id).unwrap();
    assert_eq!(found.content, "left");

    let err = fx
        .store
        .get_snapshot(fx.owner, right.id, snapshot.id)
        .unwrap_err();
    assert!(matches!(err, RepoError::SnapshotNotFound(id) if id == snapshot.id));
}

#[test]
fn pruned_snapshot_is_not_found() {
    let fx = fixture(1);
    let note = fx.create_note("first");
    let first = fx.store.list_versions(fx.owner, note.id).unwrap().remove(0);
    fx.store
        .commit(fx.owner, note.id, 1, "second", ChangeType::Manual)
        .unwrap();

    let err = fx.store.get_snapshot(fx.owner, note.id, first.id).unwrap_err();
    assert!(matches!(err, RepoError::SnapshotNotFound(_)));
}

#[test]
fn unknown_note_is_not_found() {
    let fx = fixture(10);
    let missing = Uuid::new_v4();

    assert!(matches!(
        fx.store.commit(fx.owner, missing, 1, "x", ChangeType::Manual),
        Err(RepoError::NoteNotFound(id)) if id == missing
    ));
    assert!(matches!(
        fx.store.list_versions(fx.owner, missing),
        Err(RepoError::NoteNotFound(_))
    ));
}
