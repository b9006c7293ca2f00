use crate::application::autosave::{AutosaveScheduler, SaveState};
use crate::application::bootstrap::bootstrap_workspace;
use crate::domain::catalog::{Catalog, CatalogPort, PurposeDraft};
use crate::domain::day_view::{DayView, project_day};
use crate::domain::models::{
    LogDraft, LogPrefill, LogRecord, Person, PlanDraft, PlanRecord, PurposeCategory, RecordMode,
    Selection, parse_date,
};
use crate::domain::overlay::is_superseded;
use crate::domain::record_store::{RecordStore, StoreError};
use crate::domain::report::{ReportSummary, ReportWindow, build_report};
use crate::domain::selection::{Candidate, RangeSelector, ReleaseOutcome};
use crate::domain::slot_grid::SlotGrid;
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::config::{
    RemoteSettings, read_catalog, read_grid_window, read_persistence_settings, resolve_timezone,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::rest_snapshot_store::RestSnapshotStore;
use crate::infrastructure::snapshot_store::{Snapshot, SnapshotStore, SqliteSnapshotStore};
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    log: Arc<CommandLog>,
    grid: Arc<SlotGrid>,
    timezone: Tz,
    configured_catalog: Catalog,
    debounce: Duration,
    remote: Option<RemoteSettings>,
    runtime: Mutex<RuntimeState>,
    autosave: Option<AutosaveScheduler>,
    now_provider: NowProvider,
}

struct RuntimeState {
    store: RecordStore,
    catalog: Catalog,
    selector: RangeSelector,
    current_date: NaiveDate,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = bootstrap.config_dir;

        let window = read_grid_window(&config_dir)?;
        let grid = Arc::new(SlotGrid::new(window).map_err(InfraError::InvalidConfig)?);
        let timezone = resolve_timezone(&config_dir)?;
        let configured_catalog = read_catalog(&config_dir)?;
        let persistence = read_persistence_settings(&config_dir)?;
        let now_provider: NowProvider = Arc::new(Utc::now);
        let current_date = now_provider().with_timezone(&timezone).date_naive();

        Ok(Self {
            config_dir,
            database_path: bootstrap.database_path,
            log: Arc::new(CommandLog::new(bootstrap.logs_dir)),
            runtime: Mutex::new(RuntimeState {
                store: RecordStore::default(),
                catalog: configured_catalog.clone(),
                selector: RangeSelector::new(&grid, RecordMode::Log),
                current_date,
            }),
            grid,
            timezone,
            configured_catalog,
            debounce: Duration::from_millis(persistence.debounce_ms),
            remote: persistence.remote,
            autosave: None,
            now_provider,
        })
    }

    /// Persists through the configured remote when there is one, else the local database.
    pub fn with_autosave(self, handle: Handle) -> Result<Self, InfraError> {
        let store: Arc<dyn SnapshotStore> = match &self.remote {
            Some(remote) => Arc::new(RestSnapshotStore::from_env(remote)?),
            None => Arc::new(SqliteSnapshotStore::new(&self.database_path)),
        };
        Ok(self.with_snapshot_store(store, handle))
    }

    pub fn with_snapshot_store(mut self, store: Arc<dyn SnapshotStore>, handle: Handle) -> Self {
        self.autosave = Some(AutosaveScheduler::new(
            store,
            handle,
            self.debounce,
            Arc::clone(&self.log),
        ));
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        let today = self.today();
        if let Ok(runtime) = self.runtime.get_mut() {
            runtime.current_date = today;
        }
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    pub fn today(&self) -> NaiveDate {
        (self.now_provider)()
            .with_timezone(&self.timezone)
            .date_naive()
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.log.info(command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.log.error(command, message);
    }

    fn persist(&self, runtime: &RuntimeState) {
        if let Some(autosave) = &self.autosave {
            autosave.schedule(Snapshot::capture(&runtime.store, &runtime.catalog));
        }
    }

    fn view(&self, runtime: &RuntimeState) -> DayView {
        project_day(
            &self.grid,
            &runtime.store,
            &runtime.catalog,
            &runtime.selector,
            runtime.current_date,
        )
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PressResponse {
    pub accepted: bool,
    pub candidate: Option<Candidate>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseResponse {
    #[serde(rename_all = "camelCase")]
    Committed {
        mode: RecordMode,
        selection: Selection,
        log_prefill: Option<LogPrefill>,
    },
    #[serde(rename_all = "camelCase")]
    Rejected {
        mode: RecordMode,
        start_index: usize,
        end_index: usize,
    },
    Ignored,
}

pub async fn load_snapshot_impl(state: &AppState) -> Result<DayView, InfraError> {
    let Some(autosave) = &state.autosave else {
        let runtime = lock_runtime(state)?;
        return Ok(state.view(&runtime));
    };

    let loaded = autosave.store().load().await?;
    let mut runtime = lock_runtime(state)?;
    match loaded {
        Some(snapshot) => {
            let (store, catalog, dropped) =
                snapshot.restore(&state.configured_catalog, &state.grid);
            for reason in &dropped {
                state.log_error("load_snapshot", &format!("dropped stored {reason}"));
            }
            runtime.store = store;
            runtime.catalog = catalog;
            state.log_info(
                "load_snapshot",
                &format!(
                    "loaded entries={} plans={} dropped={}",
                    runtime.store.entries.len(),
                    runtime.store.plans.len(),
                    dropped.len()
                ),
            );
        }
        None => state.log_info("load_snapshot", "no stored snapshot"),
    }
    runtime.selector.cancel();
    Ok(state.view(&runtime))
}

pub fn day_view_impl(state: &AppState) -> Result<DayView, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(state.view(&runtime))
}

pub fn set_current_date_impl(state: &AppState, date: String) -> Result<DayView, InfraError> {
    let date = parse_date(&date, "date").map_err(InfraError::InvalidConfig)?;
    let mut runtime = lock_runtime(state)?;
    runtime.current_date = date;
    runtime.selector.cancel();
    Ok(state.view(&runtime))
}

pub fn change_day_impl(state: &AppState, offset_days: i64) -> Result<DayView, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let step = Days::new(offset_days.unsigned_abs());
    let moved = if offset_days >= 0 {
        runtime.current_date.checked_add_days(step)
    } else {
        runtime.current_date.checked_sub_days(step)
    }
    .ok_or_else(|| InfraError::InvalidConfig(format!("cannot move {offset_days} days")))?;
    runtime.current_date = moved;
    runtime.selector.cancel();
    Ok(state.view(&runtime))
}

pub fn today_impl(state: &AppState) -> Result<DayView, InfraError> {
    let today = state.today();
    let mut runtime = lock_runtime(state)?;
    runtime.current_date = today;
    runtime.selector.cancel();
    Ok(state.view(&runtime))
}

pub fn set_mode_impl(state: &AppState, mode: String) -> Result<DayView, InfraError> {
    let mode = mode.parse::<RecordMode>().map_err(InfraError::InvalidConfig)?;
    let mut runtime = lock_runtime(state)?;
    runtime.selector.set_mode(mode);
    Ok(state.view(&runtime))
}

pub fn press_slot_impl(state: &AppState, slot: usize) -> Result<PressResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let occupancy = runtime.store.day_occupancy(&state.grid, runtime.current_date);
    let accepted = runtime.selector.press(slot, &occupancy);
    Ok(PressResponse {
        accepted,
        candidate: runtime.selector.candidate(&occupancy),
    })
}

pub fn drag_over_slot_impl(state: &AppState, slot: usize) -> Result<Option<Candidate>, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let occupancy = runtime.store.day_occupancy(&state.grid, runtime.current_date);
    Ok(runtime.selector.drag_over(slot, &occupancy))
}

pub fn release_selection_impl(state: &AppState) -> Result<ReleaseResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let date = runtime.current_date;
    let occupancy = runtime.store.day_occupancy(&state.grid, date);
    let outcome = runtime.selector.release(date, &state.grid, &occupancy);
    drop(runtime);

    let response = match outcome {
        ReleaseOutcome::Committed { mode, selection } => {
            state.log_info(
                "release_selection",
                &format!(
                    "selected mode={} date={} start={} duration={}",
                    mode.as_str(),
                    selection.date,
                    selection.start_time,
                    selection.duration
                ),
            );
            let log_prefill =
                (mode == RecordMode::Log).then(|| LogPrefill::for_selection(selection.clone()));
            ReleaseResponse::Committed {
                mode,
                selection,
                log_prefill,
            }
        }
        ReleaseOutcome::Rejected { mode, lo, hi } => {
            state.log_info(
                "release_selection",
                &format!("rejected overlapping {} selection slots={lo}..={hi}", mode.as_str()),
            );
            ReleaseResponse::Rejected {
                mode,
                start_index: lo,
                end_index: hi,
            }
        }
        ReleaseOutcome::Ignored => ReleaseResponse::Ignored,
    };
    Ok(response)
}

pub fn cancel_selection_impl(state: &AppState) -> Result<DayView, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.selector.cancel();
    Ok(state.view(&runtime))
}

pub fn save_plan_impl(state: &AppState, draft: PlanDraft) -> Result<PlanRecord, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let saved = runtime.store.plans.upsert(draft, &state.grid)?;
    state.persist(&runtime);
    drop(runtime);

    state.log_info(
        "save_plan",
        &format!("saved plan_id={} date={}", saved.id, saved.range.date),
    );
    Ok(saved)
}

pub fn delete_plan_impl(state: &AppState, date: String, plan_id: String) -> Result<PlanRecord, InfraError> {
    let date = parse_date(&date, "date").map_err(InfraError::InvalidConfig)?;
    let mut runtime = lock_runtime(state)?;
    let removed = runtime.store.plans.remove(date, plan_id.trim())?;
    state.persist(&runtime);
    drop(runtime);

    state.log_info(
        "delete_plan",
        &format!("deleted plan_id={} date={date}", removed.id),
    );
    Ok(removed)
}

pub fn save_entry_impl(state: &AppState, mut draft: LogDraft) -> Result<LogRecord, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let purpose = runtime.catalog.purpose(&draft.details.purpose_id);
    draft.details = draft
        .details
        .conform_to(purpose)
        .map_err(|error| InfraError::Store(StoreError::InvalidRecord(error)))?;
    let saved = runtime.store.entries.upsert(draft, &state.grid)?;
    state.persist(&runtime);
    drop(runtime);

    state.log_info(
        "save_entry",
        &format!("saved entry_id={} date={}", saved.id, saved.range.date),
    );
    Ok(saved)
}

pub fn delete_entry_impl(state: &AppState, date: String, entry_id: String) -> Result<LogRecord, InfraError> {
    let date = parse_date(&date, "date").map_err(InfraError::InvalidConfig)?;
    let mut runtime = lock_runtime(state)?;
    let removed = runtime.store.entries.remove(date, entry_id.trim())?;
    state.persist(&runtime);
    drop(runtime);

    state.log_info(
        "delete_entry",
        &format!("deleted entry_id={} date={date}", removed.id),
    );
    Ok(removed)
}

/// Hands an existing plan back to the form as an editable draft.
pub fn edit_plan_impl(state: &AppState, date: String, plan_id: String) -> Result<PlanDraft, InfraError> {
    let date = parse_date(&date, "date").map_err(InfraError::InvalidConfig)?;
    let runtime = lock_runtime(state)?;
    let plan = runtime
        .store
        .plans
        .find(date, plan_id.trim())
        .ok_or_else(|| StoreError::StaleId {
            mode: RecordMode::Plan.as_str(),
            date,
            id: plan_id.trim().to_string(),
        })?;
    Ok(plan.to_draft())
}

pub fn edit_entry_impl(state: &AppState, date: String, entry_id: String) -> Result<LogDraft, InfraError> {
    let date = parse_date(&date, "date").map_err(InfraError::InvalidConfig)?;
    let runtime = lock_runtime(state)?;
    let entry = runtime
        .store
        .entries
        .find(date, entry_id.trim())
        .ok_or_else(|| StoreError::StaleId {
            mode: RecordMode::Log.as_str(),
            date,
            id: entry_id.trim().to_string(),
        })?;
    Ok(entry.to_draft())
}

/// Prefills a log for a visible plan; a plan already covered by logged time cannot be logged again.
pub fn log_from_plan_impl(state: &AppState, date: String, plan_id: String) -> Result<LogPrefill, InfraError> {
    let date = parse_date(&date, "date").map_err(InfraError::InvalidConfig)?;
    let runtime = lock_runtime(state)?;
    let plan = runtime
        .store
        .plans
        .find(date, plan_id.trim())
        .ok_or_else(|| StoreError::StaleId {
            mode: RecordMode::Plan.as_str(),
            date,
            id: plan_id.trim().to_string(),
        })?;

    let occupancy = runtime.store.day_occupancy(&state.grid, date);
    if is_superseded(&state.grid, plan, occupancy.log()) {
        return Err(InfraError::InvalidConfig(format!(
            "plan {} already overlaps logged time",
            plan.id
        )));
    }
    Ok(LogPrefill::from_plan(plan))
}

pub fn report_impl(state: &AppState, window: Option<String>) -> Result<ReportSummary, InfraError> {
    let window = match window.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => raw.parse::<ReportWindow>().map_err(InfraError::InvalidConfig)?,
        None => ReportWindow::default(),
    };
    let today = state.today();
    let runtime = lock_runtime(state)?;
    Ok(build_report(&runtime.store.entries, &runtime.catalog, window, today))
}

pub fn add_purpose_impl(state: &AppState, draft: PurposeDraft) -> Result<PurposeCategory, InfraError> {
    let now = (state.now_provider)();
    let mut runtime = lock_runtime(state)?;
    let purpose = runtime
        .catalog
        .add_purpose(draft, now)
        .map_err(InfraError::InvalidConfig)?;
    state.persist(&runtime);
    drop(runtime);

    state.log_info("add_purpose", &format!("added purpose_id={}", purpose.id));
    Ok(purpose)
}

pub fn add_person_impl(state: &AppState, name: String) -> Result<Person, InfraError> {
    let now = (state.now_provider)();
    let mut runtime = lock_runtime(state)?;
    let person = runtime
        .catalog
        .add_person(&name, now)
        .map_err(InfraError::InvalidConfig)?;
    state.persist(&runtime);
    drop(runtime);

    state.log_info("add_person", &format!("added person_id={}", person.id));
    Ok(person)
}

pub fn list_catalog_impl(state: &AppState) -> Result<Catalog, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.catalog.clone())
}

pub fn save_status_impl(state: &AppState) -> Result<SaveState, InfraError> {
    Ok(state
        .autosave
        .as_ref()
        .map(AutosaveScheduler::status)
        .unwrap_or_default())
}

pub async fn flush_impl(state: &AppState) -> Result<SaveState, InfraError> {
    let Some(autosave) = &state.autosave else {
        return Ok(SaveState::default());
    };
    let snapshot = {
        let runtime = lock_runtime(state)?;
        Snapshot::capture(&runtime.store, &runtime.catalog)
    };
    autosave.flush(snapshot).await?;
    Ok(autosave.status())
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}
