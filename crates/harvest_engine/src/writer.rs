use std::io::{self, Write};
use std::path::PathBuf;

use harvest_core::{HarvestConfig, Record};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Streams records into `out` as one JSON array: `[` then elements separated
/// by `,` then `]` on `finish`.
pub struct JsonArrayWriter<W: Write> {
    out: W,
    first: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(mut out: W) -> Result<Self, WriteError> {
        out.write_all(b"[")?;
        Ok(Self { out, first: true })
    }

    pub fn write_many(&mut self, records: &[Record]) -> Result<usize, WriteError> {
        for record in records {
            if self.first {
                self.first = false;
            } else {
                self.out.write_all(b",")?;
            }
            serde_json::to_writer(&mut self.out, record)?;
        }
        Ok(records.len())
    }

    pub fn finish(mut self) -> Result<W, WriteError> {
        self.out.write_all(b"]")?;
        Ok(self.out)
    }
}

/// Writes each threshold-sized batch to its own `<prefix>_<index>.json`.
#[derive(Debug, Clone)]
pub struct ChunkWriter {
    files: AtomicFileWriter,
    prefix: String,
}

impl ChunkWriter {
    pub fn new(dir: PathBuf, prefix: impl Into<String>) -> Self {
        Self {
            files: AtomicFileWriter::new(dir),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.output_dir.clone(), config.file_prefix.clone())
    }

    pub fn filename(&self, file_index: u64) -> String {
        format!("{}_{}.json", self.prefix, file_index)
    }

    /// Write `records` as one complete file; returns its final path.
    pub fn write_chunk(&self, file_index: u64, records: &[Record]) -> Result<PathBuf, WriteError> {
        self.files
            .write_with(&self.filename(file_index), |out| -> Result<(), WriteError> {
                let mut array = JsonArrayWriter::new(out)?;
                array.write_many(records)?;
                array.finish()?;
                Ok(())
            })
    }
}
