use serde::{Deserialize, Serialize};

pub const UNASSIGNED: &str = "Unassigned";

/// Snapshot of one remote issue, normalized across trackers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Tracker-native id, the only key used to correlate with local notes.
    pub id: String,
    pub state: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub assigned_to: String,
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_scenarios: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Already normalized, e.g. `#backend #ui`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// Set when the tracker reports a resolution; drives lifecycle moves.
    #[serde(default)]
    pub completed: bool,
}

impl TaskRecord {
    /// Builds a record with the required fields; everything else starts empty.
    pub fn new(id: impl Into<String>, state: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: state.into(),
            title: title.into(),
            task_type: String::new(),
            assigned_to: UNASSIGNED.to_string(),
            link: String::new(),
            description: String::new(),
            acceptance_criteria: None,
            test_scenarios: None,
            due_date: None,
            tags: None,
            completed: false,
        }
    }

    /// Type name with interior whitespace stripped so it can double as a tag.
    pub fn type_tag(&self) -> String {
        self.task_type.split_whitespace().collect()
    }
}

/// Turns tracker labels into `#tag` tokens. Labels are split on `;` and `,`
/// (Azure packs them into one string) and inner whitespace is dropped.
pub fn normalize_tags<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let tags: Vec<String> = labels
        .into_iter()
        .flat_map(|l| l.split([';', ',']))
        .map(|l| l.split_whitespace().collect::<String>())
        .filter(|l| !l.is_empty())
        .map(|l| format!("#{}", l.trim_start_matches('#')))
        .collect();
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(" "))
    }
}
