use async_trait::async_trait;
use base64::Engine;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    non_empty_or_placeholder, query_identities, send_json, FetchedTasks, SourceAdapter,
};
use crate::config::{base_url, JiraAuthKind, JiraConfig, JiraMode, SyncConfig};
use crate::error::{Result, SyncError};
use crate::model::period::Period;
use crate::model::task::{normalize_tags, TaskRecord, UNASSIGNED};
use crate::util::adf::description_text;

const PAGE_SIZE: u32 = 50;
const ISSUE_FIELDS: &str =
    "summary,status,issuetype,assignee,description,duedate,labels,resolution";

pub struct JiraAdapter {
    base_url: String,
    board_id: String,
    auth_header: String,
    mode: JiraMode,
    use_board_columns: bool,
    completed_folder: String,
    client: reqwest::Client,
}

impl JiraAdapter {
    pub fn new(config: &JiraConfig) -> Self {
        let auth_header = match config.auth {
            JiraAuthKind::Basic => {
                let creds = format!("{}:{}", config.email, config.api_token);
                let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
                format!("Basic {encoded}")
            }
            JiraAuthKind::Bearer => format!("Bearer {}", config.api_token),
        };
        Self {
            base_url: base_url(&config.base_url),
            board_id: urlencoding::encode(config.board_id.trim()).into_owned(),
            auth_header,
            mode: config.mode,
            use_board_columns: config.use_board_columns,
            completed_folder: config.completed_folder.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn board_url(&self, rest: &str) -> String {
        let board = format!("{}/rest/agile/1.0/board/{}", self.base_url, self.board_id);
        if rest.is_empty() {
            board
        } else {
            format!("{board}/{rest}")
        }
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", &self.auth_header)
    }

    fn issues_url(&self, period: &Period) -> String {
        match self.mode {
            JiraMode::Scrum => self.board_url(&format!("sprint/{}/issue", period.id)),
            JiraMode::Kanban => self.board_url("issue"),
        }
    }

    /// Follows `startAt`/`total` paging until every issue has been read.
    async fn search(&self, url: &str, jql: Option<String>) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        let mut start_at: u32 = 0;

        loop {
            let mut params = vec![
                ("startAt", start_at.to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("fields", ISSUE_FIELDS.to_string()),
            ];
            if let Some(jql) = &jql {
                params.push(("jql", jql.clone()));
            }
            let page: IssuePage =
                send_json(self.get(url.to_string()).query(&params), "Jira issue search").await?;

            let received = page.issues.len() as u32;
            issues.extend(page.issues);
            start_at += received;
            if received == 0 || start_at >= page.total {
                break;
            }
        }

        Ok(issues)
    }

    fn to_task(&self, issue: Issue) -> Option<TaskRecord> {
        let fields = issue.fields;
        let state = fields.status.map(|s| s.name).filter(|s| !s.trim().is_empty())?;

        let mut task =
            TaskRecord::new(issue.key.clone(), state, fields.summary.unwrap_or_default());
        task.task_type = fields.issuetype.map(|t| t.name).unwrap_or_default();
        task.assigned_to = fields
            .assignee
            .map(|a| a.display_name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNASSIGNED.to_string());
        task.link = format!("{}/browse/{}", self.base_url, issue.key);
        task.description =
            non_empty_or_placeholder(fields.description.as_ref().and_then(description_text));
        task.due_date = fields.duedate;
        task.tags = normalize_tags(fields.labels.iter().map(String::as_str));
        task.completed = fields.resolution.is_some_and(|r| !r.is_null());
        Some(task)
    }
}

fn assignee_jql(name: &str) -> String {
    format!("assignee = \"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[derive(Deserialize)]
struct SprintList {
    #[serde(default)]
    values: Vec<Sprint>,
}

#[derive(Deserialize)]
struct Sprint {
    id: u64,
    name: String,
    state: String,
}

#[derive(Deserialize)]
struct Board {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardConfiguration {
    column_config: ColumnConfig,
}

#[derive(Deserialize)]
struct ColumnConfig {
    #[serde(default)]
    columns: Vec<Column>,
}

#[derive(Deserialize)]
struct Column {
    name: String,
}

#[derive(Deserialize)]
struct IssuePage {
    #[serde(default)]
    total: u32,
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Deserialize)]
struct Issue {
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    summary: Option<String>,
    status: Option<NamedField>,
    issuetype: Option<NamedField>,
    assignee: Option<Assignee>,
    description: Option<Value>,
    duedate: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    resolution: Option<Value>,
}

#[derive(Deserialize)]
struct NamedField {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Assignee {
    display_name: String,
}

#[async_trait]
impl SourceAdapter for JiraAdapter {
    fn name(&self) -> &str {
        "Jira"
    }

    async fn current_period(&self) -> Result<Period> {
        match self.mode {
            JiraMode::Scrum => {
                let request = self.get(self.board_url("sprint")).query(&[("state", "active")]);
                let sprints: SprintList = send_json(request, "Jira sprint lookup")
                    .await
                    .map_err(|e| SyncError::PeriodResolution(e.to_string()))?;
                let sprint = sprints
                    .values
                    .into_iter()
                    .find(|s| s.state.eq_ignore_ascii_case("active"))
                    .ok_or_else(|| {
                        SyncError::PeriodResolution(format!(
                            "Jira board {} has no active sprint",
                            self.board_id
                        ))
                    })?;
                debug!(sprint = sprint.id, "resolved active Jira sprint");
                Ok(Period::new(
                    sprint.id.to_string(),
                    sprint.name,
                    format!("sprint-{}", sprint.id),
                ))
            }
            JiraMode::Kanban => {
                let board: Board = send_json(self.get(self.board_url("")), "Jira board lookup")
                    .await
                    .map_err(|e| SyncError::PeriodResolution(e.to_string()))?;
                Ok(Period::new(board.id.to_string(), board.name, ""))
            }
        }
    }

    async fn fetch_tasks(&self, period: &Period, config: &SyncConfig) -> Result<FetchedTasks> {
        let url = self.issues_url(period);
        let issues: Vec<Issue> = match query_identities(config) {
            None => self.search(&url, None).await?,
            Some(names) => {
                try_join_all(names.into_iter().map(|n| self.search(&url, Some(assignee_jql(n)))))
                    .await?
                    .into_iter()
                    .flatten()
                    .collect()
            }
        };
        debug!(count = issues.len(), "Jira search returned issues");

        let mut fetched = FetchedTasks::default();
        for issue in issues {
            let key = issue.key.clone();
            match self.to_task(issue) {
                Some(task) => fetched.tasks.push(task),
                None => {
                    warn!(key = %key, "skipping Jira issue without status");
                    fetched.skipped.push((key, "issue has no status".into()));
                }
            }
        }
        Ok(fetched)
    }

    async fn columns(&self, config: &SyncConfig) -> Result<Vec<String>> {
        if !self.use_board_columns {
            return Ok(config.columns.clone());
        }
        let board: BoardConfiguration = send_json(
            self.get(self.board_url("configuration")),
            "Jira board configuration",
        )
        .await?;
        Ok(board
            .column_config
            .columns
            .into_iter()
            .map(|c| c.name.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect())
    }

    fn completed_folder(&self) -> Option<&str> {
        match self.mode {
            JiraMode::Kanban => Some(self.completed_folder.as_str()),
            JiraMode::Scrum => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::EMPTY_FIELD;
    use serde_json::json;

    fn config(auth: JiraAuthKind, mode: JiraMode) -> JiraConfig {
        JiraConfig {
            base_url: "acme.atlassian.net".into(),
            board_id: "12".into(),
            auth,
            email: "ada@acme.io".into(),
            api_token: "tok".into(),
            mode,
            use_board_columns: false,
            completed_folder: "Completed".into(),
        }
    }

    #[test]
    fn basic_and_bearer_auth() {
        let basic = JiraAdapter::new(&config(JiraAuthKind::Basic, JiraMode::Scrum));
        // base64("ada@acme.io:tok")
        assert_eq!(basic.auth_header, "Basic YWRhQGFjbWUuaW86dG9r");
        let bearer = JiraAdapter::new(&config(JiraAuthKind::Bearer, JiraMode::Scrum));
        assert_eq!(bearer.auth_header, "Bearer tok");
    }

    #[test]
    fn issue_urls_follow_mode() {
        let period = Period::new("7", "Sprint 7", "sprint-7");
        let scrum = JiraAdapter::new(&config(JiraAuthKind::Basic, JiraMode::Scrum));
        assert_eq!(
            scrum.issues_url(&period),
            "https://acme.atlassian.net/rest/agile/1.0/board/12/sprint/7/issue"
        );
        assert_eq!(scrum.completed_folder(), None);

        let kanban = JiraAdapter::new(&config(JiraAuthKind::Basic, JiraMode::Kanban));
        assert_eq!(
            kanban.issues_url(&period),
            "https://acme.atlassian.net/rest/agile/1.0/board/12/issue"
        );
        assert_eq!(kanban.completed_folder(), Some("Completed"));
    }

    #[test]
    fn assignee_jql_escapes_quotes() {
        assert_eq!(assignee_jql("Ada \"The\" L"), "assignee = \"Ada \\\"The\\\" L\"");
    }

    #[test]
    fn maps_issue_fields() {
        let adapter = JiraAdapter::new(&config(JiraAuthKind::Basic, JiraMode::Kanban));
        let issue: Issue = serde_json::from_value(json!({
            "key": "ENG-4",
            "fields": {
                "summary": "Ship it",
                "status": {"name": "Done"},
                "issuetype": {"name": "Sub task"},
                "assignee": null,
                "description": null,
                "duedate": "2024-06-30",
                "labels": ["backend"],
                "resolution": {"name": "Fixed"}
            }
        }))
        .unwrap();
        let task = adapter.to_task(issue).unwrap();
        assert_eq!(task.id, "ENG-4");
        assert_eq!(task.state, "Done");
        assert_eq!(task.type_tag(), "Subtask");
        assert_eq!(task.assigned_to, UNASSIGNED);
        assert_eq!(task.description, EMPTY_FIELD);
        assert_eq!(task.due_date.as_deref(), Some("2024-06-30"));
        assert_eq!(task.tags.as_deref(), Some("#backend"));
        assert_eq!(task.link, "https://acme.atlassian.net/browse/ENG-4");
        assert!(task.completed);
    }

    #[test]
    fn issue_without_status_is_dropped() {
        let adapter = JiraAdapter::new(&config(JiraAuthKind::Basic, JiraMode::Scrum));
        let issue: Issue =
            serde_json::from_value(json!({"key": "ENG-5", "fields": {"summary": "x"}})).unwrap();
        assert!(adapter.to_task(issue).is_none());
    }
}
