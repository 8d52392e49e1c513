use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::model::period::Period;
use crate::notes::NoteHandle;

#[derive(Debug)]
pub struct ItemFailure {
    /// Task id, or `board` for the board document.
    pub item: String,
    pub error: SyncError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Complete,
    /// The pass finished but some items were skipped or failed.
    Partial,
}

/// What one pass did, collected for the final notification.
#[derive(Debug)]
pub struct SyncReport {
    pub period: Period,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks: usize,
    pub created: Vec<NoteHandle>,
    pub existing: usize,
    pub moved: Vec<NoteHandle>,
    pub duplicates: usize,
    pub remote_skipped: Vec<(String, String)>,
    pub failures: Vec<ItemFailure>,
    pub board: Option<PathBuf>,
}

impl SyncReport {
    pub fn new(period: Period, started_at: DateTime<Utc>) -> Self {
        Self {
            period,
            started_at,
            finished_at: started_at,
            tasks: 0,
            created: Vec::new(),
            existing: 0,
            moved: Vec::new(),
            duplicates: 0,
            remote_skipped: Vec::new(),
            failures: Vec::new(),
            board: None,
        }
    }

    pub fn outcome(&self) -> SyncOutcome {
        if self.failures.is_empty() && self.remote_skipped.is_empty() {
            SyncOutcome::Complete
        } else {
            SyncOutcome::Partial
        }
    }

    pub fn summary(&self) -> String {
        let mut text = format!(
            "{}: {} tasks, {} notes created, {} moved",
            self.period.name,
            self.tasks,
            self.created.len(),
            self.moved.len()
        );
        if self.board.is_some() {
            text.push_str(", board updated");
        }
        let problems = self.failures.len() + self.remote_skipped.len();
        if problems > 0 {
            text.push_str(&format!(" ({problems} items skipped, see log)"));
        }
        text
    }
}
