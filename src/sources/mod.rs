pub mod azure;
pub mod jira;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::{AppConfig, SourceKind, SyncConfig};
use crate::error::{Result, SyncError};
use crate::model::period::Period;
use crate::model::task::TaskRecord;

/// Placeholder written for free-text fields the tracker returned as null.
pub const EMPTY_FIELD: &str = "Not provided";

/// Issues returned by one fetch, plus items that could not be loaded.
#[derive(Debug, Default)]
pub struct FetchedTasks {
    pub tasks: Vec<TaskRecord>,
    /// `(item reference, reason)` for items skipped after a per-item failure.
    pub skipped: Vec<(String, String)>,
}

/// A remote tracker the sync engine can pull tasks from.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// The active sprint or iteration. Fails with `PeriodResolution` when
    /// there is none.
    async fn current_period(&self) -> Result<Period>;

    /// Tasks of `period`, one query for the whole team or one per identity.
    async fn fetch_tasks(&self, period: &Period, config: &SyncConfig) -> Result<FetchedTasks>;

    /// Board columns, in display order.
    async fn columns(&self, config: &SyncConfig) -> Result<Vec<String>> {
        Ok(config.columns.clone())
    }

    /// Folder (relative to the target folder) that receives notes of
    /// completed tasks, for trackers that file them away.
    fn completed_folder(&self) -> Option<&str> {
        None
    }
}

pub fn create_source(config: &AppConfig) -> Result<Box<dyn SourceAdapter>> {
    match config.source {
        SourceKind::Azure => {
            let cfg = config
                .azure
                .as_ref()
                .ok_or_else(|| SyncError::Config("missing [azure] section".into()))?;
            Ok(Box::new(azure::AzureAdapter::new(cfg)))
        }
        SourceKind::Jira => {
            let cfg = config
                .jira
                .as_ref()
                .ok_or_else(|| SyncError::Config("missing [jira] section".into()))?;
            Ok(Box::new(jira::JiraAdapter::new(cfg)))
        }
    }
}

/// Identities to query, or `None` for a single unfiltered team query.
pub(crate) fn query_identities(config: &SyncConfig) -> Option<Vec<&str>> {
    if config.team_mode {
        return None;
    }
    Some(
        config
            .identities
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .collect(),
    )
}

pub(crate) fn non_empty_or_placeholder(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| EMPTY_FIELD.to_string())
}

/// Sends a request and decodes a JSON body, turning transport failures,
/// non-success statuses and parse errors into `RemoteQuery`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    context: &str,
) -> Result<T> {
    let resp = request
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| SyncError::remote(context, e))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(SyncError::remote(context, format!("HTTP {status}: {snippet}")));
    }

    resp.json()
        .await
        .map_err(|e| SyncError::remote(context, format!("malformed response: {e}")))
}

#[cfg(test)]
mod tests;
