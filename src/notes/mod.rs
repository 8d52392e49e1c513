pub mod fs;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::period::BOARD_SUFFIX;
use crate::model::task::TaskRecord;

/// A note inside the vault, addressed by its vault-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteHandle {
    pub path: PathBuf,
}

impl NoteHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File name without the `.md` extension, which is what wiki links use.
    pub fn link_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn folder(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

/// Task notes under one scope, listed once and searched in memory.
/// Generated board documents are never part of the index.
#[derive(Debug)]
pub struct NoteIndex {
    notes: Vec<NoteHandle>,
}

impl NoteIndex {
    pub fn new(notes: impl IntoIterator<Item = NoteHandle>) -> Self {
        let mut notes: Vec<NoteHandle> = notes
            .into_iter()
            .filter(|n| !n.link_name().ends_with(BOARD_SUFFIX))
            .collect();
        notes.sort();
        Self { notes }
    }

    /// First note, by path, whose file name carries `id` as a delimited token.
    pub fn find(&self, id: &str) -> Option<&NoteHandle> {
        self.notes
            .iter()
            .find(|n| name_has_task_id(&n.link_name(), id))
    }
}

/// Templates used when a note has to be created.
#[derive(Debug, Clone)]
pub struct NoteTemplates {
    pub content: String,
    pub name: String,
}

/// Local note collection the sync engine reads from and writes into.
///
/// Implementations never delete or rewrite task notes; the only destructive
/// operation is [`NoteStore::replace_document`], reserved for derived files.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Every note under `scope`, recursively.
    async fn list_notes(&self, scope: &Path) -> Result<Vec<NoteHandle>>;

    /// Task notes under `scope`, for repeated lookups by id. Notes filed in
    /// any subfolder are included, so earlier periods are searched too.
    async fn index(&self, scope: &Path) -> Result<NoteIndex> {
        Ok(NoteIndex::new(self.list_notes(scope).await?))
    }

    /// Renders both templates for `task` and writes the note into `folder`.
    /// Fails with `NoteCreateConflict` if the target path is already taken.
    async fn create_note(
        &self,
        folder: &Path,
        task: &TaskRecord,
        templates: &NoteTemplates,
    ) -> Result<NoteHandle>;

    /// Creates `folder` and its parents; existing folders are left alone.
    async fn create_folders(&self, folder: &Path) -> Result<()>;

    async fn create_folders_from_list(&self, folders: &[PathBuf]) -> Result<()> {
        for folder in folders {
            self.create_folders(folder).await?;
        }
        Ok(())
    }

    /// Moves a note into `folder`, keeping its file name and content.
    async fn move_note(&self, note: &NoteHandle, folder: &Path) -> Result<NoteHandle>;

    /// Deletes `path` if present and writes `contents` in its place.
    async fn replace_document(&self, path: &Path, contents: &str) -> Result<()>;
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Whether `name` contains `id` as a whole token, i.e. not glued to other
/// id characters on either side. `1` does not match `Bug - 21`, and `PROJ-1`
/// does not match `Bug - PROJ-12`.
pub fn name_has_task_id(name: &str, id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    name.match_indices(id).any(|(start, _)| {
        let before = name[..start].chars().next_back();
        let after = name[start + id.len()..].chars().next();
        !before.is_some_and(is_id_char) && !after.is_some_and(is_id_char)
    })
}
