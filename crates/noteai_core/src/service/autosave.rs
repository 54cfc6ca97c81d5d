//! Debounced auto-save scheduling.
//!
//! # Responsibility
//! - Coalesce rapid edits of one note into a single conflict-checked commit
//!   after a quiet period.
//! - Report the fate of every scheduled edit through its `SaveTicket`.
//!
//! # Invariants
//! - Per owner and note there is at most one pending save and at most one
//!   commit in flight. Scheduling again supersedes (never merges with) the
//!   pending save; it never touches the commit in flight.
//! - A pending save whose window elapses while a commit is in flight waits
//!   for that commit and then runs on the same task, so its version check
//!   sees the result of the earlier commit.
//! - A pending save is committed at most once and never retried.
//! - Slot transitions happen under one mutex that is never held across an
//!   `.await`.

use crate::model::note::{NoteId, OwnerId, VersionNumber};
use crate::model::version::ChangeType;
use crate::service::conflict::{ConflictDetector, SaveError, SaveReceipt};
use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// An edit waiting for its debounce window to elapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAutoSave {
    pub owner_id: OwnerId,
    pub note_id: NoteId,
    pub content: String,
    /// Version the client based this edit on.
    pub client_version: VersionNumber,
    pub arrived_at: Instant,
    /// Past this instant the edit is discarded instead of committed.
    pub expires_at: Instant,
}

/// Final result delivered to a `SaveTicket`.
#[derive(Debug)]
pub enum AutoSaveOutcome {
    Committed(SaveReceipt),
    /// The commit path rejected or failed the write.
    Failed(SaveError),
    /// A newer edit for the same note replaced this one.
    Superseded,
    /// The edit was still pending past its TTL when its turn came.
    Expired,
    /// Cancelled explicitly or by scheduler shutdown.
    Cancelled,
}

impl AutoSaveOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// Write pipeline state of one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Scheduled,
    /// A commit is in flight; a newer edit may be pending behind it.
    Committing,
}

/// Handle to the eventual outcome of one `schedule_save` call.
#[derive(Debug)]
pub struct SaveTicket {
    note_id: NoteId,
    receiver: oneshot::Receiver<AutoSaveOutcome>,
}

impl SaveTicket {
    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    /// Waits for the outcome. Resolves to `Cancelled` if the scheduler went
    /// away without answering.
    pub async fn outcome(self) -> AutoSaveOutcome {
        self.receiver.await.unwrap_or(AutoSaveOutcome::Cancelled)
    }
}

type SlotKey = (OwnerId, NoteId);

struct Scheduled {
    generation: u64,
    pending: PendingAutoSave,
    responder: oneshot::Sender<AutoSaveOutcome>,
    timer: JoinHandle<()>,
    /// Window elapsed while a commit was in flight.
    due: bool,
}

/// Pending save handed to the task that commits it.
struct Due {
    generation: u64,
    pending: PendingAutoSave,
    responder: oneshot::Sender<AutoSaveOutcome>,
}

#[derive(Default)]
struct Slot {
    /// Generation of the commit in flight.
    committing: Option<u64>,
    scheduled: Option<Scheduled>,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.committing.is_none() && self.scheduled.is_none()
    }
}

struct SchedulerInner {
    detector: ConflictDetector,
    runtime: Handle,
    debounce_window: Duration,
    pending_ttl: Duration,
    next_generation: AtomicU64,
    slots: Mutex<HashMap<SlotKey, Slot>>,
}

/// Per-note debounce timers in front of the conflict-checked write path.
///
/// Dropping the scheduler cancels every save that has not started
/// committing.
pub struct AutoSaveScheduler {
    inner: Arc<SchedulerInner>,
}

impl AutoSaveScheduler {
    /// Creates a scheduler that spawns its timers on `runtime`.
    pub fn new(
        detector: ConflictDetector,
        runtime: Handle,
        debounce_window: Duration,
        pending_ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                detector,
                runtime,
                debounce_window,
                pending_ttl,
                next_generation: AtomicU64::new(0),
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn debounce_window(&self) -> Duration {
        self.inner.debounce_window
    }

    /// Arms (or re-arms) the debounce timer for this owner's note.
    ///
    /// Any edit still waiting for the same note resolves as `Superseded`.
    pub fn schedule_save(
        &self,
        owner_id: OwnerId,
        note_id: NoteId,
        content: impl Into<String>,
        client_version: VersionNumber,
    ) -> SaveTicket {
        let key = (owner_id, note_id);
        let (responder, receiver) = oneshot::channel();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let arrived_at = Instant::now();
        let pending = PendingAutoSave {
            owner_id,
            note_id,
            content: content.into(),
            client_version,
            arrived_at,
            expires_at: arrived_at + self.inner.pending_ttl,
        };

        let mut slots = self.inner.lock_slots();
        let slot = slots.entry(key).or_default();
        if let Some(previous) = slot.scheduled.take() {
            previous.timer.abort();
            let _ = previous.responder.send(AutoSaveOutcome::Superseded);
            debug!(
                "event=autosave_superseded module=autosave status=ok note_id={note_id} generation={}",
                previous.generation
            );
        }

        let inner = Arc::clone(&self.inner);
        let timer = self
            .inner
            .runtime
            .spawn(async move { inner.fire(key, generation).await });
        slot.scheduled = Some(Scheduled {
            generation,
            pending,
            responder,
            timer,
            due: false,
        });
        debug!(
            "event=autosave_scheduled module=autosave status=ok note_id={note_id} generation={generation} client_version={client_version} delay_ms={}",
            self.inner.debounce_window.as_millis()
        );

        SaveTicket { note_id, receiver }
    }

    /// Drops the pending save for this owner's note. A commit already in
    /// flight is not affected.
    ///
    /// Returns whether a pending save was cancelled.
    pub fn cancel(&self, owner_id: OwnerId, note_id: NoteId) -> bool {
        let key = (owner_id, note_id);
        let mut slots = self.inner.lock_slots();
        let Some(slot) = slots.get_mut(&key) else {
            return false;
        };
        let Some(scheduled) = slot.scheduled.take() else {
            return false;
        };
        if slot.is_empty() {
            slots.remove(&key);
        }
        cancel_scheduled(note_id, scheduled);
        true
    }

    /// Cancels every pending save that has not started committing.
    pub fn cancel_all(&self) -> usize {
        let mut slots = self.inner.lock_slots();
        let mut cancelled = 0;
        for ((_, note_id), slot) in slots.iter_mut() {
            if let Some(scheduled) = slot.scheduled.take() {
                cancel_scheduled(*note_id, scheduled);
                cancelled += 1;
            }
        }
        slots.retain(|_, slot| !slot.is_empty());
        cancelled
    }

    /// Current pipeline state of this owner's note.
    pub fn state(&self, owner_id: OwnerId, note_id: NoteId) -> PipelineState {
        match self.inner.lock_slots().get(&(owner_id, note_id)) {
            Some(slot) if slot.committing.is_some() => PipelineState::Committing,
            Some(slot) if slot.scheduled.is_some() => PipelineState::Scheduled,
            _ => PipelineState::Idle,
        }
    }

    /// Number of edits waiting to commit, including those queued behind a
    /// commit in flight.
    pub fn pending_count(&self) -> usize {
        self.inner
            .lock_slots()
            .values()
            .filter(|slot| slot.scheduled.is_some())
            .count()
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        let cancelled = self.cancel_all();
        if cancelled > 0 {
            info!("event=autosave_shutdown module=autosave status=ok cancelled={cancelled}");
        }
    }
}

impl SchedulerInner {
    async fn fire(self: Arc<Self>, key: SlotKey, generation: u64) {
        tokio::time::sleep(self.debounce_window).await;

        let mut next = self.take_due(key, generation);
        while let Some(due) = next {
            let outcome = self.commit(&due).await;
            next = self.finish(key);
            let _ = due.responder.send(outcome);
        }
    }

    async fn commit(&self, due: &Due) -> AutoSaveOutcome {
        let note_id = due.pending.note_id;
        let generation = due.generation;
        if Instant::now() > due.pending.expires_at {
            info!(
                "event=autosave_expired module=autosave status=ok note_id={note_id} generation={generation}"
            );
            return AutoSaveOutcome::Expired;
        }

        let detector = self.detector.clone();
        let pending = due.pending.clone();
        let commit = self.runtime.spawn_blocking(move || {
            detector.check_and_apply(
                pending.owner_id,
                pending.note_id,
                &pending.content,
                pending.client_version,
                ChangeType::AutoSave,
            )
        });
        match commit.await {
            Ok(Ok(receipt)) => AutoSaveOutcome::Committed(receipt),
            Ok(Err(err)) => {
                debug!(
                    "event=autosave_commit module=autosave status=error note_id={note_id} generation={generation} error_code={}",
                    err.code()
                );
                AutoSaveOutcome::Failed(err)
            }
            Err(join_err) => {
                error!(
                    "event=autosave_commit module=autosave status=error note_id={note_id} error_code=commit_task_aborted error={join_err}"
                );
                AutoSaveOutcome::Cancelled
            }
        }
    }

    /// Claims the pending save of `generation` for committing.
    ///
    /// While another commit is in flight the save is only marked due and
    /// left for that commit's task to pick up.
    fn take_due(&self, key: SlotKey, generation: u64) -> Option<Due> {
        let mut slots = self.lock_slots();
        let slot = slots.get_mut(&key)?;
        let scheduled = slot
            .scheduled
            .as_mut()
            .filter(|scheduled| scheduled.generation == generation)?;
        if let Some(in_flight) = slot.committing {
            scheduled.due = true;
            debug!(
                "event=autosave_deferred module=autosave status=ok note_id={} generation={generation} in_flight={in_flight}",
                key.1
            );
            return None;
        }

        let scheduled = slot.scheduled.take()?;
        slot.committing = Some(generation);
        Some(Due {
            generation,
            pending: scheduled.pending,
            responder: scheduled.responder,
        })
    }

    /// Ends the commit in flight and claims the next save if it is already
    /// due.
    fn finish(&self, key: SlotKey) -> Option<Due> {
        let mut slots = self.lock_slots();
        let slot = slots.get_mut(&key)?;
        slot.committing = None;

        let mut next = None;
        if slot.scheduled.as_ref().is_some_and(|scheduled| scheduled.due) {
            if let Some(scheduled) = slot.scheduled.take() {
                slot.committing = Some(scheduled.generation);
                next = Some(Due {
                    generation: scheduled.generation,
                    pending: scheduled.pending,
                    responder: scheduled.responder,
                });
            }
        }
        if slot.is_empty() {
            slots.remove(&key);
        }
        next
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<SlotKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cancel_scheduled(note_id: NoteId, scheduled: Scheduled) {
    scheduled.timer.abort();
    let _ = scheduled.responder.send(AutoSaveOutcome::Cancelled);
    debug!(
        "event=autosave_cancelled module=autosave status=ok note_id={note_id} generation={}",
        scheduled.generation
    );
}
