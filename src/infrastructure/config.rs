use crate::domain::catalog::{Catalog, default_catalog};
use crate::domain::slot_grid::GridWindow;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const GRID_JSON: &str = "grid.json";
const CATALOG_JSON: &str = "catalog.json";
const PERSISTENCE_JSON: &str = "persistence.json";
const DEFAULT_DEBOUNCE_MS: u64 = 1000;

pub const REMOTE_API_KEY_ENV: &str = "TIMEBLOCK_REMOTE_API_KEY";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub grid: serde_json::Value,
    pub catalog: serde_json::Value,
    pub persistence: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub endpoint: String,
    pub table: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceSettings {
    pub debounce_ms: u64,
    pub remote: Option<RemoteSettings>,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    let catalog = default_catalog();
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Time Block Analysis",
                "timezone": "UTC"
            }),
        ),
        (
            GRID_JSON,
            serde_json::json!({
                "schema": 1,
                "dayStart": "08:00",
                "dayEnd": "17:30"
            }),
        ),
        (
            CATALOG_JSON,
            serde_json::json!({
                "schema": 1,
                "purposeCategories": catalog.purpose_categories,
                "people": catalog.people
            }),
        ),
        (
            PERSISTENCE_JSON,
            serde_json::json!({
                "schema": 1,
                "debounceMs": DEFAULT_DEBOUNCE_MS,
                "remote": null
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        grid: read_config(&config_dir.join(GRID_JSON))?,
        catalog: read_config(&config_dir.join(CATALOG_JSON))?,
        persistence: read_config(&config_dir.join(PERSISTENCE_JSON))?,
    })
}

fn non_empty_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn read_timezone(config_dir: &Path) -> Result<Option<String>, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(non_empty_str(&app, "timezone").map(ToOwned::to_owned))
}

/// The zone that decides which calendar day "today" is. Defaults to UTC.
pub fn resolve_timezone(config_dir: &Path) -> Result<Tz, InfraError> {
    match read_timezone(config_dir)? {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone `{name}`"))),
        None => Ok(Tz::UTC),
    }
}

pub fn read_grid_window(config_dir: &Path) -> Result<GridWindow, InfraError> {
    let grid = read_config(&config_dir.join(GRID_JSON))?;
    let defaults = GridWindow::default();
    let default_start = defaults.day_start.format("%H:%M").to_string();
    let default_end = defaults.day_end.format("%H:%M").to_string();
    GridWindow::parse(
        non_empty_str(&grid, "dayStart").unwrap_or(&default_start),
        non_empty_str(&grid, "dayEnd").unwrap_or(&default_end),
    )
    .map_err(InfraError::InvalidConfig)
}

pub fn read_catalog(config_dir: &Path) -> Result<Catalog, InfraError> {
    let path = config_dir.join(CATALOG_JSON);
    let raw = read_config(&path)?;
    let catalog: Catalog = serde_json::from_value(raw)?;
    catalog
        .validate()
        .map_err(|error| InfraError::InvalidConfig(format!("{error} in {}", path.display())))?;
    Ok(catalog)
}

pub fn read_persistence_settings(config_dir: &Path) -> Result<PersistenceSettings, InfraError> {
    let persistence = read_config(&config_dir.join(PERSISTENCE_JSON))?;
    let debounce_ms = match persistence.get("debounceMs") {
        None | Some(serde_json::Value::Null) => DEFAULT_DEBOUNCE_MS,
        Some(value) => value.as_u64().ok_or_else(|| {
            InfraError::InvalidConfig("debounceMs must be a non-negative integer".to_string())
        })?,
    };

    let remote = match persistence.get("remote") {
        None | Some(serde_json::Value::Null) => None,
        Some(remote) => {
            let field = |key: &str| {
                non_empty_str(remote, key)
                    .map(ToOwned::to_owned)
                    .ok_or_else(|| InfraError::InvalidConfig(format!("remote.{key} must not be empty")))
            };
            Some(RemoteSettings {
                endpoint: field("endpoint")?,
                table: non_empty_str(remote, "table")
                    .unwrap_or("user_data")
                    .to_string(),
                user_id: field("userId")?,
            })
        }
    };

    Ok(PersistenceSettings {
        debounce_ms,
        remote,
    })
}
