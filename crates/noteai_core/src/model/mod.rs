//! Domain model for notes and their version history.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Derive the rendered projection stored next to note content.
//!
//! # Invariants
//! - Every note and snapshot is identified by a stable UUID.
//! - Snapshots are immutable once created.
//! - Deletion of notes is represented by soft-delete tombstones.

pub mod note;
pub mod version;
