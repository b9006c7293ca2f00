use crate::domain::models::{LogDetails, Person, PlanDetails, PurposeCategory};
use crate::domain::record_store::DayBook;
use crate::infrastructure::config::{REMOTE_API_KEY_ENV, RemoteSettings};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::snapshot_store::{Snapshot, SnapshotStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// One row per user in a PostgREST-style table, upserted on `user_id`.
#[derive(Debug, Clone)]
pub struct RestSnapshotStore {
    client: Client,
    table_url: Url,
    user_id: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct SnapshotRow<'a> {
    user_id: &'a str,
    date: String,
    entries: &'a DayBook<LogDetails>,
    plans: &'a DayBook<PlanDetails>,
    purpose_categories: &'a [PurposeCategory],
    people: &'a [Person],
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct StoredRow {
    #[serde(default)]
    entries: Option<DayBook<LogDetails>>,
    #[serde(default)]
    plans: Option<DayBook<PlanDetails>>,
    #[serde(default)]
    purpose_categories: Option<Vec<PurposeCategory>>,
    #[serde(default)]
    people: Option<Vec<Person>>,
}

impl From<StoredRow> for Snapshot {
    fn from(row: StoredRow) -> Self {
        Self {
            entries: row.entries.unwrap_or_default(),
            plans: row.plans.unwrap_or_default(),
            purpose_categories: row.purpose_categories.unwrap_or_default(),
            people: row.people.unwrap_or_default(),
        }
    }
}

impl RestSnapshotStore {
    pub fn new(
        endpoint: &str,
        table: &str,
        user_id: &str,
        api_key: &str,
    ) -> Result<Self, InfraError> {
        Self::ensure_non_empty(endpoint, "remote endpoint")?;
        Self::ensure_non_empty(table, "remote table")?;
        Self::ensure_non_empty(user_id, "remote user id")?;
        Self::ensure_non_empty(api_key, "remote api key")?;
        Ok(Self {
            client: Client::new(),
            table_url: Self::table_endpoint(endpoint, table)?,
            user_id: user_id.trim().to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    pub fn from_env(settings: &RemoteSettings) -> Result<Self, InfraError> {
        Self::from_lookup(settings, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(settings: &RemoteSettings, lookup: F) -> Result<Self, InfraError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(REMOTE_API_KEY_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                InfraError::InvalidConfig(format!("{REMOTE_API_KEY_ENV} is not set"))
            })?;
        Self::new(
            &settings.endpoint,
            &settings.table,
            &settings.user_id,
            &api_key,
        )
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::InvalidConfig(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("snapshot api error: http {}", status.as_u16())
        } else {
            format!("snapshot api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Http(message)
    }

    fn table_endpoint(endpoint: &str, table: &str) -> Result<Url, InfraError> {
        let mut url = Url::parse(endpoint.trim()).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid remote endpoint url: {error}"))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("remote endpoint URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("rest");
            segments.push("v1");
            segments.push(table.trim());
        }
        Ok(url)
    }

    fn row<'a>(&'a self, snapshot: &'a Snapshot, now: DateTime<Utc>) -> SnapshotRow<'a> {
        SnapshotRow {
            user_id: &self.user_id,
            date: now.date_naive().format("%Y-%m-%d").to_string(),
            entries: &snapshot.entries,
            plans: &snapshot.plans,
            purpose_categories: &snapshot.purpose_categories,
            people: &snapshot.people,
            updated_at: now.to_rfc3339(),
        }
    }
}

#[async_trait]
impl SnapshotStore for RestSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, InfraError> {
        let user_filter = format!("eq.{}", self.user_id);
        let response = self
            .client
            .get(self.table_url.clone())
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "updated_at.desc"),
                ("limit", "1"),
            ])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while loading snapshot: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading snapshot response: {error}")))?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        let rows: Vec<StoredRow> = serde_json::from_str(&body).map_err(|error| {
            InfraError::Persistence(format!("invalid snapshot payload: {error}; body={body}"))
        })?;
        Ok(rows.into_iter().next().map(Snapshot::from))
    }

    async fn save(&self, snapshot: Snapshot) -> Result<(), InfraError> {
        let row = self.row(&snapshot, Utc::now());
        let response = self
            .client
            .post(self.table_url.clone())
            .query(&[("on_conflict", "user_id")])
            .header("apikey", &self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .bearer_auth(&self.api_key)
            .json(&row)
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while saving snapshot: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::http_error(status, &body));
        }
        Ok(())
    }
}
