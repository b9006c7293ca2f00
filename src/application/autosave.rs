use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::snapshot_store::{Snapshot, SnapshotStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

const SAVED_STATUS_HOLD: Duration = Duration::from_secs(2);
const ERROR_STATUS_HOLD: Duration = Duration::from_secs(3);

const PENDING_WAITING: u8 = 0;
const PENDING_RUNNING: u8 = 1;
const PENDING_CANCELLED: u8 = 2;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveState {
    pub status: SaveStatus,
    pub last_error: Option<String>,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl Default for SaveState {
    fn default() -> Self {
        Self {
            status: SaveStatus::Idle,
            last_error: None,
            last_saved_at: None,
        }
    }
}

struct PendingSave {
    task: JoinHandle<()>,
    phase: Arc<AtomicU8>,
}

struct SaveShared {
    store: Arc<dyn SnapshotStore>,
    log: Arc<CommandLog>,
    state: Mutex<SaveState>,
    // Bumped on every status change so a stale revert timer leaves newer states alone.
    status_generation: AtomicU64,
    save_lock: tokio::sync::Mutex<()>,
    saved_hold: Duration,
    error_hold: Duration,
}

impl SaveShared {
    fn set_status(&self, status: SaveStatus, error: Option<String>) -> u64 {
        let generation = self.status_generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut state) = self.state.lock() {
            state.status = status;
            match status {
                SaveStatus::Saved => {
                    state.last_error = None;
                    state.last_saved_at = Some(Utc::now());
                }
                SaveStatus::Error => state.last_error = error,
                SaveStatus::Idle | SaveStatus::Saving => {}
            }
        }
        generation
    }

    fn revert_to_idle(&self, generation: u64) {
        if self.status_generation.load(Ordering::SeqCst) != generation {
            return;
        }
        if let Ok(mut state) = self.state.lock() {
            state.status = SaveStatus::Idle;
        }
    }

    async fn save_now(self: &Arc<Self>, snapshot: Snapshot) -> Result<(), InfraError> {
        let _serialized = self.save_lock.lock().await;
        self.set_status(SaveStatus::Saving, None);
        let result = self.store.save(snapshot).await;

        let (generation, hold) = match &result {
            Ok(()) => {
                self.log.info("autosave", "snapshot saved");
                (self.set_status(SaveStatus::Saved, None), self.saved_hold)
            }
            Err(error) => {
                self.log.error("autosave", &error.to_string());
                (
                    self.set_status(SaveStatus::Error, Some(error.to_string())),
                    self.error_hold,
                )
            }
        };

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            shared.revert_to_idle(generation);
        });
        result
    }
}

/// Debounced fire-and-forget persistence of full snapshots.
///
/// Each `schedule` call replaces a save that is still waiting out its delay.
/// A save that has already started always runs to completion; saves never overlap.
pub struct AutosaveScheduler {
    shared: Arc<SaveShared>,
    handle: Handle,
    debounce: Duration,
    pending: Mutex<Option<PendingSave>>,
}

impl AutosaveScheduler {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        handle: Handle,
        debounce: Duration,
        log: Arc<CommandLog>,
    ) -> Self {
        Self {
            shared: Arc::new(SaveShared {
                store,
                log,
                state: Mutex::new(SaveState::default()),
                status_generation: AtomicU64::new(0),
                save_lock: tokio::sync::Mutex::new(()),
                saved_hold: SAVED_STATUS_HOLD,
                error_hold: ERROR_STATUS_HOLD,
            }),
            handle,
            debounce,
            pending: Mutex::new(None),
        }
    }

    /// Shortens how long saved/error stay visible; only meaningful before the first save.
    pub fn with_status_hold(mut self, saved: Duration, error: Duration) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.saved_hold = saved;
            shared.error_hold = error;
        }
        self
    }

    pub fn store(&self) -> Arc<dyn SnapshotStore> {
        Arc::clone(&self.shared.store)
    }

    pub fn status(&self) -> SaveState {
        self.shared
            .state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    pub fn schedule(&self, snapshot: Snapshot) {
        let Ok(mut pending) = self.pending.lock() else {
            return;
        };
        if let Some(previous) = pending.take() {
            Self::cancel_if_waiting(previous);
        }

        let phase = Arc::new(AtomicU8::new(PENDING_WAITING));
        let task_phase = Arc::clone(&phase);
        let shared = Arc::clone(&self.shared);
        let debounce = self.debounce;
        let task = self.handle.spawn(async move {
            tokio::time::sleep(debounce).await;
            if task_phase
                .compare_exchange(
                    PENDING_WAITING,
                    PENDING_RUNNING,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_err()
            {
                return;
            }
            let _ = shared.save_now(snapshot).await;
        });
        *pending = Some(PendingSave { task, phase });
    }

    /// Drops any waiting save and writes `snapshot` right away.
    pub async fn flush(&self, snapshot: Snapshot) -> Result<(), InfraError> {
        let previous = self
            .pending
            .lock()
            .map_err(|error| InfraError::Persistence(format!("autosave lock poisoned: {error}")))?
            .take();
        if let Some(previous) = previous {
            Self::cancel_if_waiting(previous);
        }
        self.shared.save_now(snapshot).await
    }

    fn cancel_if_waiting(pending: PendingSave) {
        let cancelled = pending
            .phase
            .compare_exchange(
                PENDING_WAITING,
                PENDING_CANCELLED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if cancelled {
            pending.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::snapshot_store::InMemorySnapshotStore;
    use crate::domain::models::Person;
    use async_trait::async_trait;
    use std::path::PathBuf;

    fn logs_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "timeblock-autosave-test-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("create logs dir");
        dir
    }

    fn snapshot_named(name: &str) -> Snapshot {
        Snapshot {
            people: vec![Person {
                id: name.to_string(),
                name: name.to_string(),
            }],
            ..Snapshot::default()
        }
    }

    fn scheduler(store: Arc<dyn SnapshotStore>, name: &str) -> AutosaveScheduler {
        AutosaveScheduler::new(
            store,
            Handle::current(),
            Duration::from_millis(30),
            Arc::new(CommandLog::new(logs_dir(name))),
        )
        .with_status_hold(Duration::from_millis(60), Duration::from_millis(60))
    }

    #[derive(Default)]
    struct RecordingStore {
        saves: Mutex<Vec<Snapshot>>,
        delay: Duration,
    }

    #[async_trait]
    impl SnapshotStore for RecordingStore {
        async fn load(&self) -> Result<Option<Snapshot>, InfraError> {
            Ok(None)
        }

        async fn save(&self, snapshot: Snapshot) -> Result<(), InfraError> {
            tokio::time::sleep(self.delay).await;
            self.saves.lock().expect("saves lock").push(snapshot);
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl SnapshotStore for FailingStore {
        async fn load(&self) -> Result<Option<Snapshot>, InfraError> {
            Ok(None)
        }

        async fn save(&self, _snapshot: Snapshot) -> Result<(), InfraError> {
            Err(InfraError::Http("snapshot api error: http 503".to_string()))
        }
    }

    #[tokio::test]
    async fn rapid_schedules_coalesce_into_latest_snapshot() {
        let store = Arc::new(RecordingStore::default());
        let autosave = scheduler(store.clone(), "coalesce");

        autosave.schedule(snapshot_named("first"));
        autosave.schedule(snapshot_named("second"));
        autosave.schedule(snapshot_named("third"));
        tokio::time::sleep(Duration::from_millis(150)).await;

        let saves = store.saves.lock().expect("saves lock").clone();
        assert_eq!(saves, vec![snapshot_named("third")]);
    }

    #[tokio::test]
    async fn in_flight_save_is_not_aborted_by_new_edits() {
        let store = Arc::new(RecordingStore {
            saves: Mutex::new(Vec::new()),
            delay: Duration::from_millis(80),
        });
        let autosave = scheduler(store.clone(), "in-flight");

        autosave.schedule(snapshot_named("first"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(autosave.status().status, SaveStatus::Saving);
        autosave.schedule(snapshot_named("second"));
        tokio::time::sleep(Duration::from_millis(300)).await;

        let saves = store.saves.lock().expect("saves lock").clone();
        assert_eq!(saves, vec![snapshot_named("first"), snapshot_named("second")]);
    }

    #[tokio::test]
    async fn status_moves_through_saved_back_to_idle() {
        let store = Arc::new(InMemorySnapshotStore::default());
        let autosave = scheduler(store.clone(), "status");
        assert_eq!(autosave.status().status, SaveStatus::Idle);

        autosave.schedule(snapshot_named("only"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let state = autosave.status();
        assert_eq!(state.status, SaveStatus::Saved);
        assert!(state.last_saved_at.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(autosave.status().status, SaveStatus::Idle);
        assert_eq!(store.current().expect("current"), Some(snapshot_named("only")));
    }

    #[tokio::test]
    async fn failures_surface_as_error_status_then_idle() {
        let autosave = scheduler(Arc::new(FailingStore), "failure");

        autosave.schedule(snapshot_named("lost"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let state = autosave.status();
        assert_eq!(state.status, SaveStatus::Error);
        assert!(state.last_error.as_deref().unwrap_or_default().contains("503"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(autosave.status().status, SaveStatus::Idle);
    }

    #[tokio::test]
    async fn flush_replaces_waiting_save() {
        let store = Arc::new(RecordingStore::default());
        let autosave = scheduler(store.clone(), "flush");

        autosave.schedule(snapshot_named("stale"));
        autosave
            .flush(snapshot_named("final"))
            .await
            .expect("flush");
        tokio::time::sleep(Duration::from_millis(80)).await;

        let saves = store.saves.lock().expect("saves lock").clone();
        assert_eq!(saves, vec![snapshot_named("final")]);
    }
}
