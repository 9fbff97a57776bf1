use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("destination directory missing or not writable: {0}")]
    Destination(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<PersistError> for io::Error {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::Io(inner) => inner,
            PersistError::Destination(message) => io::Error::new(io::ErrorKind::NotFound, message),
        }
    }
}

/// Atomically writes `content` to `target` by writing a sibling temp file and
/// renaming it over the destination. Returns the final path.
pub fn write_atomically(target: &Path, content: &[u8]) -> Result<PathBuf, PersistError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let meta = fs::metadata(&dir).map_err(|e| PersistError::Destination(e.to_string()))?;
    if !meta.is_dir() {
        return Err(PersistError::Destination(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    // The rename replaces any existing file in one step.
    tmp.persist(target).map_err(|e| PersistError::Io(e.error))?;
    Ok(target.to_path_buf())
}
