//! CLI integration tests
//!
//! Drive the `noteai` binary against a temporary database and check the
//! printed receipts and exit codes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const OWNER: &str = "6f1c1c5e-8a43-4a3e-9a55-2f0f8c7e4d11";
const STRANGER: &str = "0b7d3a52-1f3e-4c8e-8f0a-5d2b9e6c7a30";

fn setup(temp_dir: &TempDir) -> (PathBuf, PathBuf) {
    let db_path = temp_dir.path().join("noteai.db");
    let config_path = temp_dir.path().join("noteai.toml");
    fs::write(
        &config_path,
        "[versioning]\nretention_limit = 5\ndebounce_window_ms = 20\npending_ttl_ms = 5000\n",
    )
    .unwrap();
    (db_path, config_path)
}

fn run(db: &Path, config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_noteai"))
        .args(["--db", db.to_str().unwrap()])
        .args(["--config", config.to_str().unwrap()])
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn field<'a>(text: &'a str, key: &str) -> &'a str {
    let prefix = format!("{key}=");
    text.split_whitespace()
        .find_map(|token| token.strip_prefix(prefix.as_str()))
        .unwrap_or_else(|| panic!("missing `{key}` in output: {text}"))
}

fn create_note(db: &Path, config: &Path, content: &str) -> String {
    let output = run(
        db,
        config,
        &[
            "create", "--owner", OWNER, "--title", "Note", "--content", content,
        ],
    );
    assert!(output.status.success(), "create failed: {output:?}");
    let text = stdout(&output);
    assert_eq!(field(&text, "version"), "1");
    field(&text, "note_id").to_string()
}

#[test]
fn save_then_stale_save_reports_conflict() {
    let temp_dir = TempDir::new().unwrap();
    let (db, config) = setup(&temp_dir);
    let note_id = create_note(&db, &config, "A");

    let saved = run(&db, &config, &["save", &note_id, "--owner", OWNER, "--version", "1", "--content", "B"]);
    assert!(saved.status.success());
    assert_eq!(field(&stdout(&saved), "version"), "2");

    let stale = run(&db, &config, &["save", &note_id, "--owner", OWNER, "--version", "1", "--content", "C"]);
    assert_eq!(stale.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&stale.stderr);
    assert!(stderr.contains("current_version=2"));
    assert!(stderr.contains("current_content=B"));
    assert!(stderr.contains("Error: version conflict"));
}

#[test]
fn autosave_commits_only_the_last_edit() {
    let temp_dir = TempDir::new().unwrap();
    let (db, config) = setup(&temp_dir);
    let note_id = create_note(&db, &config, "start");

    let output = run(
        &db,
        &config,
        &[
            "autosave", &note_id, "--owner", OWNER, "--version", "1", "--content", "s", "st",
            "sta",
        ],
    );
    assert!(output.status.success(), "autosave failed: {output:?}");
    let text = stdout(&output);
    assert!(text.contains("edit=0 superseded"));
    assert!(text.contains("edit=1 superseded"));
    let committed = text
        .lines()
        .find(|line| line.starts_with("edit=2 committed"))
        .unwrap_or_else(|| panic!("missing commit line: {text}"));
    assert_eq!(field(committed, "version"), "2");
    assert!(text.contains("change_type=auto_save"));

    let shown = run(&db, &config, &["show", &note_id, "--owner", OWNER]);
    let shown_text = stdout(&shown);
    assert_eq!(field(&shown_text, "version"), "2");
    assert!(shown_text.trim_end().ends_with("sta"));
}

#[test]
fn restore_with_backup_adds_two_versions() {
    let temp_dir = TempDir::new().unwrap();
    let (db, config) = setup(&temp_dir);
    let note_id = create_note(&db, &config, "first draft");
    let saved = run(
        &db,
        &config,
        &[
            "save",
            &note_id,
            "--owner",
            OWNER,
            "--version",
            "1",
            "--content",
            "second draft",
        ],
    );
    assert!(saved.status.success());

    let versions = stdout(&run(&db, &config, &["versions", &note_id, "--owner", OWNER]));
    let oldest = versions.lines().last().unwrap();
    assert_eq!(field(oldest, "version"), "1");
    let snapshot_id = field(oldest, "snapshot_id").to_string();

    let restored = run(
        &db,
        &config,
        &["restore", &note_id, &snapshot_id, "--owner", OWNER, "--backup"],
    );
    assert!(restored.status.success(), "restore failed: {restored:?}");
    let text = stdout(&restored);
    assert!(text.contains("backup"));
    let restored_line = text.lines().find(|line| line.starts_with("restored")).unwrap();
    assert_eq!(field(restored_line, "version"), "4");

    let shown = stdout(&run(&db, &config, &["show", &note_id, "--owner", OWNER]));
    assert!(shown.trim_end().ends_with("first draft"));
}

#[test]
fn deleted_note_is_gone_for_its_owner() {
    let temp_dir = TempDir::new().unwrap();
    let (db, config) = setup(&temp_dir);
    let note_id = create_note(&db, &config, "bye");

    let deleted = run(&db, &config, &["delete", &note_id, "--owner", OWNER]);
    assert!(deleted.status.success());

    let shown = run(&db, &config, &["show", &note_id, "--owner", OWNER]);
    assert_eq!(shown.status.code(), Some(1));
    let listed = stdout(&run(&db, &config, &["list", "--owner", OWNER]));
    assert!(listed.contains("count=0"));
}

#[test]
fn other_owner_cannot_save_restore_or_list_versions() {
    let temp_dir = TempDir::new().unwrap();
    let (db, config) = setup(&temp_dir);
    let note_id = create_note(&db, &config, "private");
    let versions = stdout(&run(&db, &config, &["versions", &note_id, "--owner", OWNER]));
    let snapshot_id = field(versions.lines().next().unwrap(), "snapshot_id").to_string();

    let save = run(
        &db,
        &config,
        &["save", &note_id, "--owner", STRANGER, "--version", "1", "--content", "x"],
    );
    assert_eq!(save.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&save.stderr).contains("note not found"));

    let listed = run(&db, &config, &["versions", &note_id, "--owner", STRANGER]);
    assert_eq!(listed.status.code(), Some(1));

    let restored = run(
        &db,
        &config,
        &["restore", &note_id, &snapshot_id, "--owner", STRANGER],
    );
    assert_eq!(restored.status.code(), Some(1));

    let shown = stdout(&run(&db, &config, &["show", &note_id, "--owner", OWNER]));
    assert_eq!(field(&shown, "version"), "1");
    assert!(shown.trim_end().ends_with("private"));
}

#[test]
fn list_filters_by_tag_and_status_after_metadata_update() {
    let temp_dir = TempDir::new().unwrap();
    let (db, config) = setup(&temp_dir);
    let created = run(
        &db,
        &config,
        &[
            "create", "--owner", OWNER, "--title", "Roadmap", "--tag", "Work", "--tag", "plans",
        ],
    );
    assert!(created.status.success(), "create failed: {created:?}");
    let note_id = field(&stdout(&created), "note_id").to_string();
    create_note(&db, &config, "untagged");

    let tagged = stdout(&run(
        &db,
        &config,
        &["list", "--owner", OWNER, "--tag", "work"],
    ));
    assert!(tagged.contains("count=1"));
    assert!(tagged.contains(&format!("note_id={note_id}")));
    assert!(tagged.contains("tags=plans,work"));

    let updated = run(
        &db,
        &config,
        &[
            "update", &note_id, "--owner", OWNER, "--status", "published", "--favorite", "true",
        ],
    );
    assert!(updated.status.success(), "update failed: {updated:?}");
    let updated_text = stdout(&updated);
    assert_eq!(field(&updated_text, "status"), "published");
    assert_eq!(field(&updated_text, "version"), "1");

    let published = stdout(&run(
        &db,
        &config,
        &["list", "--owner", OWNER, "--status", "published", "--sort", "title"],
    ));
    assert!(published.contains("count=1"));
    assert!(published.contains("title=\"Roadmap\""));
}

#[test]
fn create_without_title_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (db, config) = setup(&temp_dir);

    let blank = run(&db, &config, &["create", "--owner", OWNER, "--title", "  "]);
    assert_eq!(blank.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&blank.stderr).contains("invalid title"));
}
