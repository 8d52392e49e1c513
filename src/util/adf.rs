use serde_json::Value;

/// Flattens a Jira description into plain text.
///
/// Server instances send a plain string; Cloud sends Atlassian Document Format.
/// Block nodes (paragraphs, headings, list items) become separate lines and
/// inline text within a block is concatenated as-is.
pub fn description_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => {
            let mut lines = Vec::new();
            collect_blocks(value, &mut lines);
            let text = lines
                .into_iter()
                .map(|l| l.trim_end().to_string())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
        _ => None,
    }
}

fn collect_blocks(node: &Value, lines: &mut Vec<String>) {
    let Some(content) = node.get("content").and_then(Value::as_array) else {
        return;
    };
    if content.iter().any(is_inline) {
        let mut line = String::new();
        for child in content {
            inline_text(child, &mut line);
        }
        lines.push(line);
    } else {
        for child in content {
            collect_blocks(child, lines);
        }
    }
}

fn is_inline(node: &Value) -> bool {
    matches!(
        node.get("type").and_then(Value::as_str),
        Some("text" | "hardBreak" | "mention" | "emoji" | "inlineCard")
    )
}

fn inline_text(node: &Value, line: &mut String) {
    match node.get("type").and_then(Value::as_str) {
        Some("text") => {
            if let Some(t) = node.get("text").and_then(Value::as_str) {
                line.push_str(t);
            }
        }
        Some("hardBreak") => line.push('\n'),
        Some("mention" | "emoji") => {
            if let Some(t) = node.pointer("/attrs/text").and_then(Value::as_str) {
                line.push_str(t);
            }
        }
        Some("inlineCard") => {
            if let Some(url) = node.pointer("/attrs/url").and_then(Value::as_str) {
                line.push_str(url);
            }
        }
        _ => {}
    }
}
