use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

use crate::error::Result;
use crate::model::task::TaskRecord;
use crate::notes::{NoteHandle, NoteStore};

const BOARD_HEADER: &str = "---\n\nkanban-plugin: basic\n\n---\n";
const BOARD_FOOTER: &str = "\n%% kanban:settings\n```\n{\"kanban-plugin\":\"basic\"}\n```\n%%\n";

/// Builds the kanban board document for one period.
pub struct BoardRenderer<'a> {
    columns: &'a [String],
    show_assignee: bool,
}

impl<'a> BoardRenderer<'a> {
    pub fn new(columns: &'a [String], show_assignee: bool) -> Self {
        Self {
            columns,
            show_assignee,
        }
    }

    /// Renders the board. Each task lands under the column equal to its state;
    /// tasks with an unknown state or without a note are left out.
    pub fn render(&self, tasks: &[TaskRecord], notes: &HashMap<String, NoteHandle>) -> String {
        let mut doc = String::from(BOARD_HEADER);

        for column in self.columns {
            let _ = write!(doc, "\n## {column}\n\n");
            for task in tasks.iter().filter(|t| t.state == *column) {
                let Some(note) = notes.get(&task.id) else {
                    continue;
                };
                doc.push_str(&self.card_line(task, note));
                doc.push('\n');
            }
        }

        doc.push_str(BOARD_FOOTER);
        doc
    }

    fn card_line(&self, task: &TaskRecord, note: &NoteHandle) -> String {
        let mut line = String::from("- [ ] ");
        if self.show_assignee {
            let _ = write!(line, "{}: ", task.assigned_to);
        }
        let _ = write!(line, "[[{}]]", note.link_name());
        let title = task.title.trim();
        if !title.is_empty() {
            let _ = write!(line, " {title}");
        }
        line
    }

    /// Looks up the note of every task under `scope` from a single listing.
    pub async fn resolve_notes(
        store: &dyn NoteStore,
        scope: &Path,
        tasks: &[TaskRecord],
    ) -> Result<HashMap<String, NoteHandle>> {
        let index = store.index(scope).await?;
        Ok(tasks
            .iter()
            .filter_map(|task| Some((task.id.clone(), index.find(&task.id)?.clone())))
            .collect())
    }

    /// Resolves notes, renders and replaces the board document at `path`.
    pub async fn write(
        &self,
        store: &dyn NoteStore,
        scope: &Path,
        path: &Path,
        tasks: &[TaskRecord],
    ) -> Result<()> {
        let notes = Self::resolve_notes(store, scope, tasks).await?;
        let doc = self.render(tasks, &notes);
        store.replace_document(path, &doc).await
    }
}
