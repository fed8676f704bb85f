//! Text files backing MMS text media.
//!
//! The structured body references text by file path, never inline. Each
//! save creates a fresh file with a random name so that concurrent
//! compositions in one process never share a path.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::debug;

use crate::error::{MessagesError, Result};

/// Writes and reads MMS text files inside one directory.
#[derive(Debug, Clone)]
pub struct TextFileStore {
    dir: PathBuf,
}

impl TextFileStore {
    /// Store text files in `dir`, created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store text files in the system temporary directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Write `text` to a new, uniquely named file.
    ///
    /// The returned [`TextFile`] deletes the file when dropped unless
    /// [`TextFile::persist`] is called.
    pub fn save(&self, text: &str) -> Result<TextFile> {
        std::fs::create_dir_all(&self.dir).map_err(|e| MessagesError::io(&self.dir, e))?;
        let mut file = tempfile::Builder::new()
            .prefix(&format!(".mms_text_{}_", std::process::id()))
            .suffix(".txt")
            .tempfile_in(&self.dir)
            .map_err(|e| MessagesError::io(&self.dir, e))?;

        file.write_all(text.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| MessagesError::io(file.path(), e))?;

        let path = file.into_temp_path();
        debug!(path = %path.display(), bytes = text.len(), "Wrote MMS text file");
        Ok(TextFile { path })
    }

    /// Read a text file into `text`.
    ///
    /// If `text` already holds a value, a newline and the file content are
    /// appended to it; otherwise it is set to the file content. Invalid
    /// UTF-8 is replaced rather than rejected.
    pub fn load(path: &Path, text: &mut Option<String>) -> Result<()> {
        let mut file = File::open(path).map_err(|e| MessagesError::io(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| MessagesError::io(path, e))?
            .len();

        let mut buf = Vec::with_capacity(size as usize);
        file.read_to_end(&mut buf)
            .map_err(|e| MessagesError::io(path, e))?;
        let content = String::from_utf8_lossy(&buf);

        match text {
            Some(existing) => {
                existing.reserve(content.len() + 1);
                existing.push('\n');
                existing.push_str(&content);
            }
            None => *text = Some(content.into_owned()),
        }
        Ok(())
    }
}

impl Default for TextFileStore {
    fn default() -> Self {
        Self::in_temp_dir()
    }
}

/// A text file written by [`TextFileStore::save`].
///
/// Removed from disk on drop unless persisted.
#[derive(Debug)]
pub struct TextFile {
    path: TempPath,
}

impl TextFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file on disk and return its path.
    pub fn persist(self) -> Result<PathBuf> {
        let path = self.path.to_path_buf();
        self.path
            .keep()
            .map_err(|e| MessagesError::io(path, e.error))
    }
}
