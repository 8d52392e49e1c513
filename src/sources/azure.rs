use async_trait::async_trait;
use base64::Engine;
use futures::future::{join_all, try_join_all};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    non_empty_or_placeholder, query_identities, send_json, FetchedTasks, SourceAdapter,
};
use crate::config::{base_url, AzureConfig, SyncConfig};
use crate::error::{Result, SyncError};
use crate::model::period::Period;
use crate::model::task::{normalize_tags, TaskRecord, UNASSIGNED};

const API_VERSION: &str = "6.0";

pub struct AzureAdapter {
    /// `{scheme}://{instance}/{collection}/{project}`
    project_url: String,
    team: String,
    auth_header: String,
    client: reqwest::Client,
}

impl AzureAdapter {
    pub fn new(config: &AzureConfig) -> Self {
        // Personal access tokens go in the password slot with an empty user.
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!(":{}", config.access_token));
        Self {
            project_url: format!(
                "{}/{}/{}",
                base_url(&config.instance),
                urlencoding::encode(&config.collection),
                urlencoding::encode(&config.project)
            ),
            team: urlencoding::encode(&config.team).into_owned(),
            auth_header: format!("Basic {encoded}"),
            client: reqwest::Client::new(),
        }
    }

    fn team_url(&self, api: &str) -> String {
        format!("{}/{}/_apis/{api}", self.project_url, self.team)
    }

    fn item_link(&self, id: u64) -> String {
        format!("{}/_workitems/edit/{id}", self.project_url)
    }

    async fn query_ids(
        &self,
        iteration_path: &str,
        identity: Option<&str>,
    ) -> Result<Vec<WorkItemRef>> {
        let body = serde_json::json!({ "query": wiql(iteration_path, identity) });
        let request = self
            .client
            .post(self.team_url("wit/wiql"))
            .query(&[("api-version", API_VERSION)])
            .header("Authorization", &self.auth_header)
            .json(&body);
        let result: WiqlResult = send_json(request, "Azure work item query").await?;
        Ok(result.work_items)
    }

    async fn fetch_item(&self, item: &WorkItemRef) -> Result<TaskRecord> {
        let request = self
            .client
            .get(&item.url)
            .header("Authorization", &self.auth_header);
        let raw: WorkItem = send_json(request, "Azure work item detail").await?;
        self.to_task(raw)
    }

    fn to_task(&self, item: WorkItem) -> Result<TaskRecord> {
        let fields = item.fields;
        let state = fields
            .state
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                SyncError::remote(
                    "Azure work item detail",
                    format!("work item {} has no state", item.id),
                )
            })?;

        let mut task =
            TaskRecord::new(item.id.to_string(), state, fields.title.unwrap_or_default());
        task.task_type = fields.work_item_type.unwrap_or_default();
        task.assigned_to = fields
            .assigned_to
            .as_ref()
            .and_then(display_name)
            .unwrap_or_else(|| UNASSIGNED.to_string());
        task.link = self.item_link(item.id);
        task.description = non_empty_or_placeholder(fields.description);
        task.acceptance_criteria = Some(non_empty_or_placeholder(fields.acceptance_criteria));
        task.test_scenarios = fields.test_steps.filter(|s| !s.trim().is_empty());
        task.due_date = fields.due_date.map(|d| short_date(&d));
        task.tags = fields.tags.as_deref().and_then(|t| normalize_tags([t]));
        Ok(task)
    }
}

fn escape_wiql(value: &str) -> String {
    value.replace('\'', "''")
}

fn wiql(iteration_path: &str, identity: Option<&str>) -> String {
    let mut query = format!(
        "SELECT [System.Id] FROM WorkItems WHERE [System.IterationPath] = '{}'",
        escape_wiql(iteration_path)
    );
    if let Some(name) = identity {
        query.push_str(&format!(" AND [System.AssignedTo] = '{}'", escape_wiql(name)));
    }
    query.push_str(" ORDER BY [System.Id]");
    query
}

/// `System.AssignedTo` is an identity object on current servers and a
/// `Name <domain\user>` string on old ones.
fn display_name(value: &Value) -> Option<String> {
    let name = match value {
        Value::Object(obj) => obj.get("displayName")?.as_str()?.to_string(),
        Value::String(s) => s.split(" <").next().unwrap_or(s).to_string(),
        _ => return None,
    };
    let name = name.trim().to_string();
    (!name.is_empty()).then_some(name)
}

fn short_date(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[derive(Deserialize)]
struct IterationList {
    #[serde(default)]
    value: Vec<Iteration>,
}

#[derive(Deserialize)]
struct Iteration {
    name: String,
    path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResult {
    #[serde(default)]
    work_items: Vec<WorkItemRef>,
}

#[derive(Deserialize)]
struct WorkItemRef {
    id: u64,
    url: String,
}

#[derive(Deserialize)]
struct WorkItem {
    id: u64,
    fields: WorkItemFields,
}

#[derive(Deserialize)]
struct WorkItemFields {
    #[serde(rename = "System.State")]
    state: Option<String>,
    #[serde(rename = "System.Title")]
    title: Option<String>,
    #[serde(rename = "System.WorkItemType")]
    work_item_type: Option<String>,
    #[serde(rename = "System.AssignedTo")]
    assigned_to: Option<Value>,
    #[serde(rename = "System.Description")]
    description: Option<String>,
    #[serde(rename = "Microsoft.VSTS.Common.AcceptanceCriteria")]
    acceptance_criteria: Option<String>,
    #[serde(rename = "Microsoft.VSTS.TCM.Steps")]
    test_steps: Option<String>,
    #[serde(rename = "Microsoft.VSTS.Scheduling.DueDate")]
    due_date: Option<String>,
    #[serde(rename = "System.Tags")]
    tags: Option<String>,
}

#[async_trait]
impl SourceAdapter for AzureAdapter {
    fn name(&self) -> &str {
        "AzureDevops"
    }

    async fn current_period(&self) -> Result<Period> {
        let request = self
            .client
            .get(self.team_url("work/teamsettings/iterations"))
            .query(&[("$timeframe", "current"), ("api-version", API_VERSION)])
            .header("Authorization", &self.auth_header);
        let iterations: IterationList = send_json(request, "Azure iteration lookup")
            .await
            .map_err(|e| SyncError::PeriodResolution(e.to_string()))?;

        let current = iterations
            .value
            .into_iter()
            .next()
            .ok_or_else(|| {
                SyncError::PeriodResolution("Azure team has no current iteration".into())
            })?;
        debug!(iteration = %current.path, "resolved current Azure iteration");
        Ok(Period::new(current.path.clone(), current.name, current.path))
    }

    async fn fetch_tasks(&self, period: &Period, config: &SyncConfig) -> Result<FetchedTasks> {
        let refs: Vec<WorkItemRef> = match query_identities(config) {
            None => self.query_ids(&period.id, None).await?,
            Some(names) => {
                try_join_all(names.into_iter().map(|n| self.query_ids(&period.id, Some(n))))
                    .await?
                    .into_iter()
                    .flatten()
                    .collect()
            }
        };
        debug!(count = refs.len(), "Azure query returned work items");

        let details = join_all(refs.iter().map(|r| self.fetch_item(r))).await;

        let mut fetched = FetchedTasks::default();
        for (item, detail) in refs.iter().zip(details) {
            match detail {
                Ok(task) => fetched.tasks.push(task),
                Err(e) => {
                    warn!(id = item.id, error = %e, "skipping Azure work item");
                    fetched.skipped.push((item.id.to_string(), e.to_string()));
                }
            }
        }
        Ok(fetched)
    }
}
