use crate::domain::catalog::Catalog;
use crate::domain::models::{LogDetails, Person, PlanDetails, PurposeCategory};
use crate::domain::record_store::{DayBook, RecordStore};
use crate::domain::slot_grid::SlotGrid;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::open_database;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Full persisted state; every save writes all of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub entries: DayBook<LogDetails>,
    #[serde(default)]
    pub plans: DayBook<PlanDetails>,
    #[serde(default)]
    pub purpose_categories: Vec<PurposeCategory>,
    #[serde(default)]
    pub people: Vec<Person>,
}

impl Snapshot {
    pub fn capture(store: &RecordStore, catalog: &Catalog) -> Self {
        Self {
            entries: store.entries.clone(),
            plans: store.plans.clone(),
            purpose_categories: catalog.purpose_categories.clone(),
            people: catalog.people.clone(),
        }
    }

    /// Splits into runtime state. An empty stored list keeps the configured one, and
    /// records that do not fit `grid` are left out and described in the third element.
    pub fn restore(
        self,
        configured: &Catalog,
        grid: &SlotGrid,
    ) -> (RecordStore, Catalog, Vec<String>) {
        let purpose_categories = if self.purpose_categories.is_empty() {
            configured.purpose_categories.clone()
        } else {
            self.purpose_categories
        };
        let people = if self.people.is_empty() {
            configured.people.clone()
        } else {
            self.people
        };
        let mut store = RecordStore::new(self.entries, self.plans);
        let dropped = store.retain_valid(grid);
        (store, Catalog::new(purpose_categories, people), dropped)
    }
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<Snapshot>, InfraError>;
    async fn save(&self, snapshot: Snapshot) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    db_path: PathBuf,
}

impl SqliteSnapshotStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn load_blocking(db_path: &Path) -> Result<Option<Snapshot>, InfraError> {
        let connection = open_database(db_path)?;
        let payload: Option<String> = connection
            .query_row("SELECT payload FROM snapshots WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(payload) = payload else {
            return Ok(None);
        };
        let snapshot = serde_json::from_str(&payload).map_err(|error| {
            InfraError::Persistence(format!("invalid stored snapshot: {error}"))
        })?;
        Ok(Some(snapshot))
    }

    fn save_blocking(
        db_path: &Path,
        snapshot: &Snapshot,
        saved_at: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        let payload = serde_json::to_string(snapshot)?;
        let connection = open_database(db_path)?;
        connection.execute(
            "INSERT INTO snapshots (id, payload, saved_at)
             VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
               payload = excluded.payload,
               saved_at = excluded.saved_at",
            params![payload, saved_at.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, InfraError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || Self::load_blocking(&db_path))
            .await
            .map_err(|error| InfraError::Persistence(format!("snapshot load task failed: {error}")))?
    }

    async fn save(&self, snapshot: Snapshot) -> Result<(), InfraError> {
        let db_path = self.db_path.clone();
        let saved_at = Utc::now();
        tokio::task::spawn_blocking(move || Self::save_blocking(&db_path, &snapshot, saved_at))
            .await
            .map_err(|error| InfraError::Persistence(format!("snapshot save task failed: {error}")))?
    }
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshot: Mutex<Option<Snapshot>>,
}

impl InMemorySnapshotStore {
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    pub fn current(&self) -> Result<Option<Snapshot>, InfraError> {
        let snapshot = self.snapshot.lock().map_err(|error| {
            InfraError::Persistence(format!("snapshot lock poisoned: {error}"))
        })?;
        Ok(snapshot.clone())
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, InfraError> {
        self.current()
    }

    async fn save(&self, snapshot: Snapshot) -> Result<(), InfraError> {
        let mut current = self.snapshot.lock().map_err(|error| {
            InfraError::Persistence(format!("snapshot lock poisoned: {error}"))
        })?;
        *current = Some(snapshot);
        Ok(())
    }
}
