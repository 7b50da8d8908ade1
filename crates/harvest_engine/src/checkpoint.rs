use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use harvest_core::{Checkpoint, HarvestConfig};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

/// Supplies the timestamp recorded in saved checkpoints.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error reading checkpoint {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed checkpoint {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Stores the restart point next to the output files.
#[derive(Clone)]
pub struct CheckpointStore {
    files: AtomicFileWriter,
    filename: String,
    clock: Clock,
}

impl CheckpointStore {
    pub fn new(config: &HarvestConfig, clock: Clock) -> Self {
        Self {
            files: AtomicFileWriter::new(config.output_dir.clone()),
            filename: config.checkpoint_filename(),
            clock,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.files.dir().join(&self.filename)
    }

    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CheckpointError::Read { path, source }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CheckpointError::Malformed { path, source })
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointError> {
        let stamped = Checkpoint {
            saved_utc: Some((self.clock)()).filter(|stamp| !stamp.is_empty()),
            ..checkpoint.clone()
        };
        let content = serde_json::to_vec_pretty(&stamped)?;
        Ok(self.files.write(&self.filename, &content)?)
    }

    pub fn clear(&self) -> Result<(), CheckpointError> {
        Ok(self.files.remove(&self.filename)?)
    }
}
