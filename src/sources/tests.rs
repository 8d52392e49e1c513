use std::path::PathBuf;

use serde_json::json;
use wiremock::matchers::{
    body_string_contains, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::azure::AzureAdapter;
use super::jira::JiraAdapter;
use super::SourceAdapter;
use crate::config::{AzureConfig, JiraAuthKind, JiraConfig, JiraMode, SyncConfig};
use crate::error::SyncError;
use crate::model::period::Period;
use crate::notes::NoteTemplates;

fn sync_config(identities: &[&str], team_mode: bool) -> SyncConfig {
    SyncConfig {
        target_folder: PathBuf::from("Tasks"),
        templates: NoteTemplates {
            content: "{{TASK_TITLE}}".into(),
            name: "{{TASK_TYPE}} - {{TASK_ID}}".into(),
        },
        columns: vec!["To Do".into(), "Done".into()],
        identities: identities.iter().map(|s| s.to_string()).collect(),
        team_mode,
        create_board: true,
    }
}

fn azure(server: &MockServer) -> AzureAdapter {
    AzureAdapter::new(&AzureConfig {
        instance: server.uri(),
        collection: "DefaultCollection".into(),
        project: "Engine".into(),
        team: "Core".into(),
        access_token: "pat".into(),
    })
}

fn jira(server: &MockServer, mode: JiraMode, use_board_columns: bool) -> JiraAdapter {
    JiraAdapter::new(&JiraConfig {
        base_url: server.uri(),
        board_id: "12".into(),
        auth: JiraAuthKind::Bearer,
        email: String::new(),
        api_token: "tok".into(),
        mode,
        use_board_columns,
        completed_folder: "Completed".into(),
    })
}

fn jira_issue(key: &str, status: &str) -> serde_json::Value {
    json!({
        "key": key,
        "fields": {
            "summary": format!("Issue {key}"),
            "status": {"name": status},
            "issuetype": {"name": "Story"},
            "assignee": {"displayName": "Ada"},
            "labels": []
        }
    })
}

const AZURE_TEAM: &str = "/DefaultCollection/Engine/Core/_apis";

#[tokio::test]
async fn azure_resolves_current_iteration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{AZURE_TEAM}/work/teamsettings/iterations")))
        .and(query_param("$timeframe", "current"))
        .and(header("Authorization", "Basic OnBhdA=="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "value": [{"id": "abc", "name": "Sprint 3", "path": "Engine\\Sprint 3"}]
        })))
        .mount(&server)
        .await;

    let period = azure(&server).current_period().await.unwrap();
    assert_eq!(period.id, "Engine\\Sprint 3");
    assert_eq!(period.name, "Sprint 3");
    assert_eq!(period.folder, "Engine/Sprint 3");
}

#[tokio::test]
async fn azure_without_iteration_is_period_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{AZURE_TEAM}/work/teamsettings/iterations")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0, "value": []})))
        .mount(&server)
        .await;

    let err = azure(&server).current_period().await.unwrap_err();
    assert!(matches!(err, SyncError::PeriodResolution(_)));
}

#[tokio::test]
async fn azure_http_error_on_iteration_is_period_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{AZURE_TEAM}/work/teamsettings/iterations")))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let err = azure(&server).current_period().await.unwrap_err();
    assert!(matches!(err, SyncError::PeriodResolution(_)));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn azure_fetches_per_identity_and_isolates_item_failures() {
    let server = MockServer::start().await;
    let item_url =
        |id: u32| format!("{}/DefaultCollection/Engine/_apis/wit/workItems/{id}", server.uri());

    Mock::given(method("POST"))
        .and(path(format!("{AZURE_TEAM}/wit/wiql")))
        .and(body_string_contains("[System.AssignedTo] = 'Ada'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workItems": [{"id": 101, "url": item_url(101)}, {"id": 102, "url": item_url(102)}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{AZURE_TEAM}/wit/wiql")))
        .and(body_string_contains("[System.AssignedTo] = 'Grace'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workItems": [{"id": 103, "url": item_url(103)}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/DefaultCollection/Engine/_apis/wit/workItems/101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 101,
            "fields": {
                "System.State": "In Progress",
                "System.Title": "A",
                "System.WorkItemType": "Bug",
                "System.AssignedTo": {"displayName": "Ada"}
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/DefaultCollection/Engine/_apis/wit/workItems/102"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/DefaultCollection/Engine/_apis/wit/workItems/103"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 103,
            "fields": {"System.State": "Closed", "System.Title": "C", "System.WorkItemType": "Task"}
        })))
        .mount(&server)
        .await;

    let period = Period::new("Engine\\Sprint 3", "Sprint 3", "Engine\\Sprint 3");
    let fetched = azure(&server)
        .fetch_tasks(&period, &sync_config(&["Ada", "Grace"], false))
        .await
        .unwrap();

    let ids: Vec<&str> = fetched.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["101", "103"]);
    assert_eq!(fetched.tasks[0].assigned_to, "Ada");
    assert_eq!(fetched.skipped.len(), 1);
    assert_eq!(fetched.skipped[0].0, "102");
}

#[tokio::test]
async fn azure_query_failure_aborts_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{AZURE_TEAM}/wit/wiql")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let period = Period::new("Engine\\Sprint 3", "Sprint 3", "Engine\\Sprint 3");
    let err = azure(&server)
        .fetch_tasks(&period, &sync_config(&[], true))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteQuery { .. }));
}

#[tokio::test]
async fn jira_picks_active_sprint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/12/sprint"))
        .and(query_param("state", "active"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [
                {"id": 6, "name": "Sprint 6", "state": "closed"},
                {"id": 7, "name": "Sprint 7", "state": "active"}
            ]
        })))
        .mount(&server)
        .await;

    let period = jira(&server, JiraMode::Scrum, false).current_period().await.unwrap();
    assert_eq!(period, Period::new("7", "Sprint 7", "sprint-7"));
}

#[tokio::test]
async fn jira_without_active_sprint_is_period_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/12/sprint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": []})))
        .mount(&server)
        .await;

    let err = jira(&server, JiraMode::Scrum, false)
        .current_period()
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::PeriodResolution(_)));
}

#[tokio::test]
async fn jira_kanban_period_is_the_board() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/12"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 12, "name": "Ops", "type": "kanban"})),
        )
        .mount(&server)
        .await;

    let period = jira(&server, JiraMode::Kanban, false).current_period().await.unwrap();
    assert_eq!(period.name, "Ops");
    assert_eq!(period.folder, "");
}

#[tokio::test]
async fn jira_follows_pagination() {
    let server = MockServer::start().await;
    let issues_path = "/rest/agile/1.0/board/12/sprint/7/issue";
    Mock::given(method("GET"))
        .and(path(issues_path))
        .and(query_param("startAt", "0"))
        .and(query_param("jql", "assignee = \"Ada\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 0, "maxResults": 2, "total": 3,
            "issues": [jira_issue("ENG-1", "To Do"), jira_issue("ENG-2", "Done")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(issues_path))
        .and(query_param("startAt", "2"))
        .and(query_param("jql", "assignee = \"Ada\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 2, "maxResults": 2, "total": 3,
            "issues": [jira_issue("ENG-3", "To Do")]
        })))
        .mount(&server)
        .await;

    let period = Period::new("7", "Sprint 7", "sprint-7");
    let fetched = jira(&server, JiraMode::Scrum, false)
        .fetch_tasks(&period, &sync_config(&["Ada"], false))
        .await
        .unwrap();
    let ids: Vec<&str> = fetched.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["ENG-1", "ENG-2", "ENG-3"]);
    assert!(fetched.skipped.is_empty());
}

#[tokio::test]
async fn jira_team_mode_sends_one_unfiltered_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/12/sprint/7/issue"))
        .and(query_param_is_missing("jql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "issues": [jira_issue("ENG-1", "To Do"), jira_issue("ENG-2", "Done")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let period = Period::new("7", "Sprint 7", "sprint-7");
    let fetched = jira(&server, JiraMode::Scrum, false)
        .fetch_tasks(&period, &sync_config(&["Ada", "Grace"], true))
        .await
        .unwrap();

    assert_eq!(fetched.tasks.len(), 2);
    server.verify().await;
}

#[tokio::test]
async fn jira_identity_queries_are_concatenated_without_dedup() {
    let server = MockServer::start().await;
    let issues_path = "/rest/agile/1.0/board/12/issue";
    for name in ["Ada", "Grace"] {
        Mock::given(method("GET"))
            .and(path(issues_path))
            .and(query_param("jql", format!("assignee = \"{name}\"")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "issues": [jira_issue("OPS-9", "Done")]
            })))
            .mount(&server)
            .await;
    }

    let period = Period::new("12", "Ops", "");
    let fetched = jira(&server, JiraMode::Kanban, false)
        .fetch_tasks(&period, &sync_config(&["Ada", "Grace"], false))
        .await
        .unwrap();
    assert_eq!(fetched.tasks.len(), 2);
}

#[tokio::test]
async fn jira_board_columns_are_trimmed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/12/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "columnConfig": {"columns": [
                {"name": " To Do "}, {"name": "In Review"}, {"name": "  "}, {"name": "Done"}
            ]}
        })))
        .mount(&server)
        .await;

    let columns = jira(&server, JiraMode::Scrum, true)
        .columns(&sync_config(&[], true))
        .await
        .unwrap();
    assert_eq!(columns, vec!["To Do", "In Review", "Done"]);

    let static_columns = jira(&server, JiraMode::Scrum, false)
        .columns(&sync_config(&[], true))
        .await
        .unwrap();
    assert_eq!(static_columns, vec!["To Do", "Done"]);
}
