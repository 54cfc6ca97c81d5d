//! Per-note mutual exclusion.
//!
//! # Responsibility
//! - Serialize check-then-commit sequences for one note.
//! - Let writes to different notes proceed in parallel.
//!
//! # Invariants
//! - At most one closure runs under the lock of a given note at a time.
//! - An entry exists only while some caller holds or waits for it; the last
//!   caller out removes it.

use crate::model::note::NoteId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type NoteMutex = Arc<Mutex<()>>;

/// Lazily populated registry of per-note locks.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct NoteLocks {
    entries: Arc<Mutex<HashMap<NoteId, NoteMutex>>>,
}

impl NoteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `note_id`.
    ///
    /// Blocks the calling thread while another writer holds the same note.
    /// Must not be re-entered for the same note from inside `f`.
    pub fn with_note_lock<T>(&self, note_id: NoteId, f: impl FnOnce() -> T) -> T {
        let note_mutex = self.acquire_entry(note_id);
        let result = {
            // Guards no data; poisoning is ignored.
            let _guard = note_mutex.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release_entry(note_id, note_mutex);
        result
    }

    /// Number of notes that currently have a holder or waiter.
    pub fn active_count(&self) -> usize {
        self.registry().len()
    }

    fn acquire_entry(&self, note_id: NoteId) -> NoteMutex {
        let mut entries = self.registry();
        Arc::clone(entries.entry(note_id).or_default())
    }

    fn release_entry(&self, note_id: NoteId, note_mutex: NoteMutex) {
        let mut entries = self.registry();
        drop(note_mutex);
        let idle = entries
            .get(&note_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1);
        if idle {
            entries.remove(&note_id);
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<NoteId, NoteMutex>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
