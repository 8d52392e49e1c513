use crate::model::task::TaskRecord;

pub const DEFAULT_NOTE_TEMPLATE: &str = "# {{TASK_TITLE}}
#{{TASK_TYPE}} {{TASK_TAGS}}

ID: {{TASK_ID}}
State: {{TASK_STATE}}
Assigned to: {{TASK_ASSIGNEDTO}}
Due: {{TASK_DUEDATE}}
Link: {{TASK_LINK}}

## Description
{{TASK_DESCRIPTION}}

#todo:
- [ ] Create todo list
- [ ] \n
## Notes:
";

pub const DEFAULT_NAME_TEMPLATE: &str = "{{TASK_TYPE}} - {{TASK_ID}}";

/// Placeholders understood by [`render`]. Anything else between braces is
/// left as written.
pub const PLACEHOLDERS: [&str; 11] = [
    "TASK_ID",
    "TASK_TITLE",
    "TASK_TYPE",
    "TASK_STATE",
    "TASK_ASSIGNEDTO",
    "TASK_LINK",
    "TASK_DESCRIPTION",
    "TASK_CRITERIA",
    "TASK_TEST_SCENARIOS",
    "TASK_DUEDATE",
    "TASK_TAGS",
];

fn value_for<'a>(task: &'a TaskRecord, type_tag: &'a str, token: &str) -> Option<&'a str> {
    let value = match token {
        "TASK_ID" => task.id.as_str(),
        "TASK_TITLE" => task.title.as_str(),
        "TASK_TYPE" => type_tag,
        "TASK_STATE" => task.state.as_str(),
        "TASK_ASSIGNEDTO" => task.assigned_to.as_str(),
        "TASK_LINK" => task.link.as_str(),
        "TASK_DESCRIPTION" => task.description.as_str(),
        "TASK_CRITERIA" => task.acceptance_criteria.as_deref().unwrap_or_default(),
        "TASK_TEST_SCENARIOS" => task.test_scenarios.as_deref().unwrap_or_default(),
        "TASK_DUEDATE" => task.due_date.as_deref().unwrap_or_default(),
        "TASK_TAGS" => task.tags.as_deref().unwrap_or_default(),
        _ => return None,
    };
    Some(value)
}

/// Tokens in `template` that [`render`] will leave untouched.
pub fn unknown_placeholders(template: &str) -> Vec<String> {
    let mut unknown = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };
        let token = after[..end].trim();
        if !PLACEHOLDERS.contains(&token) && !unknown.iter().any(|t| t == token) {
            unknown.push(token.to_string());
        }
        rest = &after[end + 2..];
    }
    unknown
}

/// Substitutes every `{{TOKEN}}` occurrence with the matching task field.
///
/// Values are inserted verbatim and never rescanned, so a title containing
/// `{{TASK_ID}}` stays literal.
pub fn render(template: &str, task: &TaskRecord) -> String {
    let type_tag = task.type_tag();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let token = &after[..end];
                match value_for(task, &type_tag, token.trim()) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(token);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
