/// Stem suffix of generated board documents.
pub const BOARD_SUFFIX: &str = "-Board";

/// The tracker's current time box (sprint or iteration), or the board itself
/// for trackers without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    /// Tracker-native identifier, e.g. an Azure iteration path or Jira sprint id.
    pub id: String,
    /// Display name, used for the board filename.
    pub name: String,
    /// Folder relative to the target folder; empty means the target folder itself.
    pub folder: String,
}

impl Period {
    pub fn new(id: impl Into<String>, name: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            folder: normalize_folder(&folder.into()),
        }
    }

    pub fn board_file_name(&self) -> String {
        format!("{}{BOARD_SUFFIX}.md", sanitize_file_name(&self.name))
    }
}

/// Converts tracker paths (`Project\Sprint 3`) into forward-slash folders
/// without empty or dot segments.
pub fn normalize_folder(raw: &str) -> String {
    raw.split(['\\', '/'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Replaces characters that are not allowed in note file names.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
