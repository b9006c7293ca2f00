pub mod application;
pub mod domain;
pub mod infrastructure;

use application::autosave::SaveState;
use application::bootstrap::bootstrap_workspace;
use application::commands::{
    PressResponse, ReleaseResponse, add_person_impl, add_purpose_impl, cancel_selection_impl,
    change_day_impl, day_view_impl, delete_entry_impl, delete_plan_impl, drag_over_slot_impl,
    edit_entry_impl, edit_plan_impl, flush_impl, list_catalog_impl, load_snapshot_impl, log_from_plan_impl, press_slot_impl,
    release_selection_impl, report_impl, save_entry_impl, save_plan_impl, save_status_impl,
    set_current_date_impl, set_mode_impl, today_impl,
};
use domain::catalog::{Catalog, PurposeDraft};
use domain::day_view::DayView;
use domain::models::{LogDraft, LogPrefill, LogRecord, Person, PlanDraft, PlanRecord, PurposeCategory};
use domain::report::ReportSummary;
use domain::selection::Candidate;
use serde::Serialize;
use std::path::PathBuf;
use tokio::runtime::Handle;

pub use application::commands::AppState;

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub workspace_root: String,
    pub database_path: String,
}

pub fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };

    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        database_path: result.database_path.display().to_string(),
    })
}

/// Opens a session rooted at `root` (or the current directory) with autosave on `handle`,
/// then restores the last stored snapshot.
pub async fn open_session(root: Option<String>, handle: Handle) -> Result<AppState, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };
    let state = AppState::new(workspace_root)
        .and_then(|state| state.with_autosave(handle))
        .map_err(|error| error.to_string())?;
    load_snapshot(&state).await?;
    Ok(state)
}

pub async fn load_snapshot(state: &AppState) -> Result<DayView, String> {
    load_snapshot_impl(state)
        .await
        .map_err(|error| state.command_error("load_snapshot", &error))
}

pub fn day_view(state: &AppState) -> Result<DayView, String> {
    day_view_impl(state).map_err(|error| state.command_error("day_view", &error))
}

pub fn set_current_date(state: &AppState, date: String) -> Result<DayView, String> {
    set_current_date_impl(state, date)
        .map_err(|error| state.command_error("set_current_date", &error))
}

pub fn change_day(state: &AppState, offset_days: i64) -> Result<DayView, String> {
    change_day_impl(state, offset_days).map_err(|error| state.command_error("change_day", &error))
}

pub fn go_to_today(state: &AppState) -> Result<DayView, String> {
    today_impl(state).map_err(|error| state.command_error("go_to_today", &error))
}

pub fn set_mode(state: &AppState, mode: String) -> Result<DayView, String> {
    set_mode_impl(state, mode).map_err(|error| state.command_error("set_mode", &error))
}

pub fn press_slot(state: &AppState, slot: usize) -> Result<PressResponse, String> {
    press_slot_impl(state, slot).map_err(|error| state.command_error("press_slot", &error))
}

pub fn drag_over_slot(state: &AppState, slot: usize) -> Result<Option<Candidate>, String> {
    drag_over_slot_impl(state, slot).map_err(|error| state.command_error("drag_over_slot", &error))
}

pub fn release_selection(state: &AppState) -> Result<ReleaseResponse, String> {
    release_selection_impl(state)
        .map_err(|error| state.command_error("release_selection", &error))
}

pub fn cancel_selection(state: &AppState) -> Result<DayView, String> {
    cancel_selection_impl(state).map_err(|error| state.command_error("cancel_selection", &error))
}

pub fn save_plan(state: &AppState, draft: PlanDraft) -> Result<PlanRecord, String> {
    save_plan_impl(state, draft).map_err(|error| state.command_error("save_plan", &error))
}

pub fn delete_plan(state: &AppState, date: String, plan_id: String) -> Result<PlanRecord, String> {
    delete_plan_impl(state, date, plan_id).map_err(|error| state.command_error("delete_plan", &error))
}

pub fn save_entry(state: &AppState, draft: LogDraft) -> Result<LogRecord, String> {
    save_entry_impl(state, draft).map_err(|error| state.command_error("save_entry", &error))
}

pub fn delete_entry(state: &AppState, date: String, entry_id: String) -> Result<LogRecord, String> {
    delete_entry_impl(state, date, entry_id)
        .map_err(|error| state.command_error("delete_entry", &error))
}

pub fn edit_plan(state: &AppState, date: String, plan_id: String) -> Result<PlanDraft, String> {
    edit_plan_impl(state, date, plan_id).map_err(|error| state.command_error("edit_plan", &error))
}

pub fn edit_entry(state: &AppState, date: String, entry_id: String) -> Result<LogDraft, String> {
    edit_entry_impl(state, date, entry_id).map_err(|error| state.command_error("edit_entry", &error))
}

pub fn log_from_plan(state: &AppState, date: String, plan_id: String) -> Result<LogPrefill, String> {
    log_from_plan_impl(state, date, plan_id)
        .map_err(|error| state.command_error("log_from_plan", &error))
}

pub fn report(state: &AppState, window: Option<String>) -> Result<ReportSummary, String> {
    report_impl(state, window).map_err(|error| state.command_error("report", &error))
}

pub fn add_purpose(state: &AppState, draft: PurposeDraft) -> Result<PurposeCategory, String> {
    add_purpose_impl(state, draft).map_err(|error| state.command_error("add_purpose", &error))
}

pub fn add_person(state: &AppState, name: String) -> Result<Person, String> {
    add_person_impl(state, name).map_err(|error| state.command_error("add_person", &error))
}

pub fn list_catalog(state: &AppState) -> Result<Catalog, String> {
    list_catalog_impl(state).map_err(|error| state.command_error("list_catalog", &error))
}

pub fn save_status(state: &AppState) -> Result<SaveState, String> {
    save_status_impl(state).map_err(|error| state.command_error("save_status", &error))
}

pub async fn flush(state: &AppState) -> Result<SaveState, String> {
    flush_impl(state)
        .await
        .map_err(|error| state.command_error("flush", &error))
}
