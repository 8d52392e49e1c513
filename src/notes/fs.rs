use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{NoteHandle, NoteStore, NoteTemplates};
use crate::error::{Result, SyncError};
use crate::model::period::sanitize_file_name;
use crate::model::task::TaskRecord;
use crate::util::template;

const NOTE_EXTENSION: &str = "md";

/// Note store backed by a vault directory on disk.
pub struct FsNoteStore {
    root: PathBuf,
}

impl FsNoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

#[async_trait]
impl NoteStore for FsNoteStore {
    /// Vault-relative handles of every `.md` file under `scope`, sorted.
    /// A missing scope has no notes.
    async fn list_notes(&self, scope: &Path) -> Result<Vec<NoteHandle>> {
        let mut notes = Vec::new();
        let mut pending = vec![scope.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let abs = self.absolute(&dir);
            let mut entries = match tokio::fs::read_dir(&abs).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(SyncError::io(abs, e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| SyncError::io(&abs, e))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| SyncError::io(entry.path(), e))?;
                let relative = dir.join(entry.file_name());
                if file_type.is_dir() {
                    pending.push(relative);
                } else if relative.extension().is_some_and(|ext| ext == NOTE_EXTENSION) {
                    notes.push(NoteHandle::new(relative));
                }
            }
        }

        notes.sort();
        Ok(notes)
    }

    async fn create_note(
        &self,
        folder: &Path,
        task: &TaskRecord,
        templates: &NoteTemplates,
    ) -> Result<NoteHandle> {
        let name = sanitize_file_name(&template::render(&templates.name, task));
        if name.is_empty() {
            return Err(SyncError::Config(format!(
                "note name template renders to an empty name for task {}",
                task.id
            )));
        }
        let relative = folder.join(format!("{name}.{NOTE_EXTENSION}"));
        let abs = self.absolute(&relative);
        let content = template::render(&templates.content, task);

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&abs)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SyncError::NoteCreateConflict(relative))
            }
            Err(e) => return Err(SyncError::io(abs, e)),
        };
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| SyncError::io(&abs, e))?;
        file.flush().await.map_err(|e| SyncError::io(&abs, e))?;

        Ok(NoteHandle::new(relative))
    }

    async fn create_folders(&self, folder: &Path) -> Result<()> {
        let abs = self.absolute(folder);
        tokio::fs::create_dir_all(&abs)
            .await
            .map_err(|e| SyncError::io(abs, e))
    }

    async fn move_note(&self, note: &NoteHandle, folder: &Path) -> Result<NoteHandle> {
        let file_name = note.path.file_name().ok_or_else(|| {
            SyncError::Config(format!("note path {} has no file name", note.path.display()))
        })?;
        let target = folder.join(file_name);
        if target == note.path {
            return Ok(note.clone());
        }

        self.create_folders(folder).await?;
        let abs_target = self.absolute(&target);
        if tokio::fs::try_exists(&abs_target)
            .await
            .map_err(|e| SyncError::io(&abs_target, e))?
        {
            return Err(SyncError::NoteCreateConflict(target));
        }
        let abs_source = self.absolute(&note.path);
        tokio::fs::rename(&abs_source, &abs_target)
            .await
            .map_err(|e| SyncError::io(abs_source, e))?;

        Ok(NoteHandle::new(target))
    }

    async fn replace_document(&self, path: &Path, contents: &str) -> Result<()> {
        let abs = self.absolute(path);
        match tokio::fs::remove_file(&abs).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::io(abs, e)),
        }
        tokio::fs::write(&abs, contents)
            .await
            .map_err(|e| SyncError::io(abs, e))
    }
}
