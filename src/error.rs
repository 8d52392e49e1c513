use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong during a sync pass.
///
/// `PeriodResolution` and `RemoteQuery` abort the pass. `NoteCreateConflict`
/// and `Io` raised while reconciling a single task only skip that task.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no active period: {0}")]
    PeriodResolution(String),

    #[error("{context}: {message}")]
    RemoteQuery { context: String, message: String },

    #[error("note path {} already exists and is not the note for this task", .0.display())]
    NoteCreateConflict(PathBuf),

    #[error("I/O failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    pub fn remote(context: impl Into<String>, message: impl ToString) -> Self {
        SyncError::RemoteQuery {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error should stop the whole pass rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::PeriodResolution(_) | SyncError::RemoteQuery { .. } | SyncError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
