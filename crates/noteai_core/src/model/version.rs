//! Version snapshot model.
//!
//! # Responsibility
//! - Define immutable content snapshots and their change classification.
//!
//! # Invariants
//! - `version` is unique per note and strictly increasing in commit order.
//! - Snapshots are never edited; restore commits a new snapshot instead.

use crate::model::note::{NoteId, VersionNumber};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one snapshot row.
pub type SnapshotId = Uuid;

/// Why a snapshot was committed.
///
/// Retention keeps `Manual` snapshots preferentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Explicit user save, note creation, or restore.
    Manual,
    /// Debounced background save from the editor.
    AutoSave,
    /// Content rewritten by the external text optimizer.
    ExternalOptimize,
}

impl ChangeType {
    /// Storage/wire name of this change type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AutoSave => "auto_save",
            Self::ExternalOptimize => "external_optimize",
        }
    }

    /// Parses the storage name produced by [`ChangeType::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(Self::Manual),
            "auto_save" => Some(Self::AutoSave),
            "external_optimize" => Some(Self::ExternalOptimize),
            _ => None,
        }
    }
}

impl Display for ChangeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable copy of a note's content at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub id: SnapshotId,
    pub note_id: NoteId,
    pub version: VersionNumber,
    pub content: String,
    pub change_type: ChangeType,
    /// Epoch milliseconds.
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::ChangeType;

    #[test]
    fn change_type_storage_names_round_trip() {
        for kind in [
            ChangeType::Manual,
            ChangeType::AutoSave,
            ChangeType::ExternalOptimize,
        ] {
            assert_eq!(ChangeType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChangeType::parse("restore"), None);
    }

    #[test]
    fn change_type_serializes_as_snake_case() {
        let json = serde_json::to_string(&ChangeType::ExternalOptimize).unwrap();
        assert_eq!(json, "\"external_optimize\"");
    }
}
