use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Publishes files into `dir` by streaming into a temp file in the same
/// directory, syncing it, then renaming it over `{dir}/{filename}`.
///
/// Readers never observe a partially written file under the final name.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        self.write_with(filename, |out| out.write_all(content).map_err(PersistError::from))
    }

    /// Stream content through `fill`; nothing is published if it fails.
    pub fn write_with<F, E>(&self, filename: &str, fill: F) -> Result<PathBuf, E>
    where
        F: FnOnce(&mut dyn Write) -> Result<(), E>,
        E: From<PersistError>,
    {
        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(PersistError::from)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            fill(&mut out)?;
            out.flush().map_err(PersistError::from)?;
        }
        tmp.as_file_mut().sync_all().map_err(PersistError::from)?;

        // Replace existing file if present.
        if target.exists() {
            fs::remove_file(&target).map_err(PersistError::from)?;
        }
        tmp.persist(&target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Remove `{dir}/{filename}`; a missing file is not an error.
    pub fn remove(&self, filename: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.dir.join(filename)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
