//! One synchronization pass: pull the current period's tasks from the
//! tracker, make sure each has a note, then rebuild the board.
//!
//! Stages run strictly in order. Remote failures before any note is written
//! abort the pass; failures on individual notes are recorded and the pass
//! carries on with the remaining tasks.

pub mod notify;
pub mod report;
pub mod schedule;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::board::BoardRenderer;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::task::TaskRecord;
use crate::notes::{NoteHandle, NoteStore};
use crate::sources::SourceAdapter;
use notify::{Notice, Notifier};
use report::{ItemFailure, SyncOutcome, SyncReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Idle,
    ResolvingPeriod,
    FetchingIssues,
    ReconcilingNotes,
    RenderingBoard,
    Done,
    Failed,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Idle => "idle",
            SyncStage::ResolvingPeriod => "resolving period",
            SyncStage::FetchingIssues => "fetching issues",
            SyncStage::ReconcilingNotes => "reconciling notes",
            SyncStage::RenderingBoard => "rendering board",
            SyncStage::Done => "done",
            SyncStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

enum NoteAction<'t> {
    Create { task: &'t TaskRecord, folder: PathBuf },
    Move { task: &'t TaskRecord, note: NoteHandle, folder: PathBuf },
}

pub struct SyncEngine {
    source: Box<dyn SourceAdapter>,
    store: Box<dyn NoteStore>,
    notifier: Box<dyn Notifier>,
    stage: SyncStage,
}

impl SyncEngine {
    pub fn new(
        source: Box<dyn SourceAdapter>,
        store: Box<dyn NoteStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            stage: SyncStage::Idle,
        }
    }

    fn enter(&mut self, stage: SyncStage) {
        info!(source = self.source.name(), %stage, "sync stage");
        self.stage = stage;
    }

    /// Runs one full pass and emits exactly one notice describing it.
    pub async fn run(&mut self, config: &SyncConfig) -> Result<SyncReport> {
        self.stage = SyncStage::Idle;
        let result = self.run_stages(config).await;

        match &result {
            Ok(report) => {
                self.enter(SyncStage::Done);
                info!(
                    elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
                    existing = report.existing,
                    duplicates = report.duplicates,
                    "sync pass finished"
                );
                for failure in &report.failures {
                    warn!(item = %failure.item, error = %failure.error, "item not synced");
                }
                let notice = match report.outcome() {
                    SyncOutcome::Complete => Notice::Success(report.summary()),
                    SyncOutcome::Partial => Notice::Partial(report.summary()),
                };
                self.notifier.notify(&notice);
            }
            Err(e) => {
                error!(stage = %self.stage, fatal = e.is_fatal(), error = ?e, "sync pass failed");
                self.stage = SyncStage::Failed;
                self.notifier.notify(&Notice::Failure(e.to_string()));
            }
        }
        result
    }

    async fn run_stages(&mut self, config: &SyncConfig) -> Result<SyncReport> {
        let started_at = chrono::Utc::now();

        self.enter(SyncStage::ResolvingPeriod);
        let period = self.source.current_period().await?;
        info!(period = %period.name, "current period");

        self.enter(SyncStage::FetchingIssues);
        let fetched = self.source.fetch_tasks(&period, config).await?;
        let columns = if config.create_board {
            self.source.columns(config).await?
        } else {
            Vec::new()
        };

        let mut report = SyncReport::new(period, started_at);
        let (tasks, duplicates) = dedupe_by_id(fetched.tasks);
        report.tasks = tasks.len();
        report.duplicates = duplicates;
        report.remote_skipped = fetched.skipped;
        if duplicates > 0 {
            debug!(duplicates, "dropped tasks returned by more than one query");
        }

        self.enter(SyncStage::ReconcilingNotes);
        let root = config.target_folder.clone();
        let period_folder = folder_under(&root, &report.period.folder);
        self.reconcile(config, &root, &period_folder, &tasks, &mut report)
            .await;

        if config.create_board {
            self.enter(SyncStage::RenderingBoard);
            let board_path = period_folder.join(report.period.board_file_name());
            let renderer = BoardRenderer::new(&columns, config.team_mode);
            match renderer
                .write(self.store.as_ref(), &root, &board_path, &tasks)
                .await
            {
                Ok(()) => report.board = Some(board_path),
                Err(error) => report.failures.push(ItemFailure {
                    item: "board".into(),
                    error,
                }),
            }
        }

        report.finished_at = chrono::Utc::now();
        Ok(report)
    }

    /// Creates missing notes and files completed ones away. All writes are
    /// awaited before returning so the board never links to a pending note.
    async fn reconcile(
        &self,
        config: &SyncConfig,
        root: &Path,
        period_folder: &Path,
        tasks: &[TaskRecord],
        report: &mut SyncReport,
    ) {
        let completed_folder = self
            .source
            .completed_folder()
            .map(|f| folder_under(root, f));

        let mut folders = vec![period_folder.to_path_buf()];
        folders.extend(completed_folder.clone());
        if let Err(e) = self.store.create_folders_from_list(&folders).await {
            warn!(error = %e, "could not create note folders");
        }

        // No listing, no creates.
        let index = match self.store.index(root).await {
            Ok(index) => index,
            Err(error) => {
                report.failures.push(ItemFailure {
                    item: root.display().to_string(),
                    error,
                });
                return;
            }
        };

        let mut actions = Vec::new();
        for task in tasks {
            let lifecycle_folder = completed_folder.as_ref().filter(|_| task.completed);
            match index.find(&task.id) {
                Some(note) => match lifecycle_folder {
                    Some(folder) if note.folder() != folder.as_path() => {
                        actions.push(NoteAction::Move {
                            task,
                            note: note.clone(),
                            folder: folder.clone(),
                        });
                    }
                    _ => {
                        debug!(id = %task.id, note = %note.path.display(), "note exists");
                        report.existing += 1;
                    }
                },
                None => actions.push(NoteAction::Create {
                    task,
                    folder: lifecycle_folder
                        .cloned()
                        .unwrap_or_else(|| period_folder.to_path_buf()),
                }),
            }
        }

        let store = self.store.as_ref();
        let results = join_all(actions.iter().map(|action| async move {
            match action {
                NoteAction::Create { task, folder } => store
                    .create_note(folder, task, &config.templates)
                    .await
                    .map(|note| (task, note, false)),
                NoteAction::Move { task, note, folder } => store
                    .move_note(note, folder)
                    .await
                    .map(|note| (task, note, true)),
            }
        }))
        .await;

        for (action, result) in actions.iter().zip(results) {
            match result {
                Ok((task, note, moved)) => {
                    debug!(id = %task.id, note = %note.path.display(), moved, "note written");
                    if moved {
                        report.moved.push(note);
                    } else {
                        report.created.push(note);
                    }
                }
                Err(error) => {
                    let task = match action {
                        NoteAction::Create { task, .. } | NoteAction::Move { task, .. } => task,
                    };
                    report.failures.push(ItemFailure {
                        item: task.id.clone(),
                        error,
                    });
                }
            }
        }
    }
}

fn folder_under(root: &Path, relative: &str) -> PathBuf {
    if relative.is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

/// Keeps the first task seen for each id.
pub fn dedupe_by_id(tasks: Vec<TaskRecord>) -> (Vec<TaskRecord>, usize) {
    let mut seen = HashSet::new();
    let before = tasks.len();
    let unique: Vec<TaskRecord> = tasks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect();
    let dropped = before - unique.len();
    (unique, dropped)
}
