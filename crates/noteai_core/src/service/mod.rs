//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own the write path of note content: per-note locking, conflict
//!   detection, history/restore and debounced auto-save.
//! - Keep CLI/UI layers decoupled from storage details.

pub mod autosave;
pub mod conflict;
pub mod history;
pub mod manager;
pub mod note_locks;
pub mod note_service;
