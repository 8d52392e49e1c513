use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notes::NoteTemplates;
use crate::util::template::{self, DEFAULT_NAME_TEMPLATE, DEFAULT_NOTE_TEMPLATE};

pub const DEFAULT_COLUMNS: [&str; 5] = [
    "Pending",
    "In Progress",
    "In Merge",
    "In Verification",
    "Closed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Azure,
    Jira,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub vault: PathBuf,
    #[serde(default = "default_target_folder")]
    pub target_folder: String,
    pub source: SourceKind,
    #[serde(default)]
    pub identities: Vec<String>,
    #[serde(default)]
    pub team_mode: bool,
    #[serde(default = "default_true")]
    pub create_board: bool,
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub poll_interval_minutes: u64,
    #[serde(default = "default_note_template")]
    pub note_template: String,
    #[serde(default = "default_name_template")]
    pub note_name_template: String,
    pub azure: Option<AzureConfig>,
    pub jira: Option<JiraConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureConfig {
    pub instance: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    pub project: String,
    pub team: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JiraAuthKind {
    #[default]
    Basic,
    Bearer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JiraMode {
    #[default]
    Scrum,
    Kanban,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
    pub base_url: String,
    pub board_id: String,
    #[serde(default)]
    pub auth: JiraAuthKind,
    #[serde(default)]
    pub email: String,
    pub api_token: String,
    #[serde(default)]
    pub mode: JiraMode,
    #[serde(default)]
    pub use_board_columns: bool,
    #[serde(default = "default_completed_folder")]
    pub completed_folder: String,
}

fn default_target_folder() -> String {
    "AgileTasks".into()
}

fn default_true() -> bool {
    true
}

fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_note_template() -> String {
    DEFAULT_NOTE_TEMPLATE.into()
}

fn default_name_template() -> String {
    DEFAULT_NAME_TEMPLATE.into()
}

fn default_collection() -> String {
    "DefaultCollection".into()
}

fn default_completed_folder() -> String {
    "Completed".into()
}

/// Read-only view of the configuration used by one sync pass.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub target_folder: PathBuf,
    pub templates: NoteTemplates,
    pub columns: Vec<String>,
    pub identities: Vec<String>,
    pub team_mode: bool,
    pub create_board: bool,
}

impl AppConfig {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            target_folder: PathBuf::from(crate::model::period::normalize_folder(
                &self.target_folder,
            )),
            templates: NoteTemplates {
                content: self.note_template.clone(),
                name: self.note_name_template.clone(),
            },
            columns: self.columns.iter().map(|c| c.trim().to_string()).collect(),
            identities: self.identities.clone(),
            team_mode: self.team_mode,
            create_board: self.create_board,
        }
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_minutes > 0)
            .then(|| Duration::from_secs(self.poll_interval_minutes * 60))
    }

    pub fn validate(&self) -> Result<()> {
        if self.vault.as_os_str().is_empty() {
            bail!("`vault` must point at the note vault directory");
        }
        if !self.team_mode && self.identities.iter().all(|i| i.trim().is_empty()) {
            bail!("`identities` must list at least one name unless `team_mode` is enabled");
        }
        if !self.note_name_template.contains("{{TASK_ID}}") {
            bail!("`note_name_template` must contain {{{{TASK_ID}}}} so notes can be found again");
        }
        match self.source {
            SourceKind::Azure if self.azure.is_none() => {
                bail!("`source = \"azure\"` requires an [azure] section")
            }
            SourceKind::Jira => match &self.jira {
                None => bail!("`source = \"jira\"` requires a [jira] section"),
                Some(jira) if jira.auth == JiraAuthKind::Basic && jira.email.is_empty() => {
                    bail!("Jira basic auth requires `email`")
                }
                Some(_) => {}
            },
            SourceKind::Azure => {}
        }
        for (key, text) in [
            ("note_template", &self.note_template),
            ("note_name_template", &self.note_name_template),
        ] {
            for token in template::unknown_placeholders(text) {
                tracing::warn!(key, token = %token, "unknown placeholder will be left as written");
            }
        }
        Ok(())
    }
}

/// Prepends `https://` when the configured host has no scheme.
pub fn base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agile-task-notes")
        .join("config.toml")
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).context("Failed to parse config.toml")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Invalid config at {}", path.display()))
}
