use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog_logging::{catalog_error, catalog_info, catalog_warn};
use harvest_core::{
    update, Checkpoint, ConfigError, Effect, HarvestConfig, HarvestState, HarvestSummary, Msg,
};
use thiserror::Error;

use crate::checkpoint::{CheckpointError, CheckpointStore, Clock};
use crate::fetch::PageFetcher;
use crate::persist::{ensure_output_dir, PersistError};
use crate::progress::ProgressSink;
use crate::retry::{fetch_with_retry, RetryPolicy};
use crate::writer::{ChunkWriter, WriteError};
use crate::HarvestEvent;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("output directory: {0}")]
    OutputDir(#[from] PersistError),
    #[error("failed to write file {file_index}: {source}")]
    Write {
        file_index: u64,
        #[source]
        source: WriteError,
    },
    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("aborted at page {page_number}, {lost_records} buffered records lost: {reason}")]
    Aborted {
        page_number: u64,
        lost_records: usize,
        reason: String,
    },
    #[error("harvest stopped before reaching the end of data")]
    Incomplete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarvestReport {
    pub summary: HarvestSummary,
    pub files: Vec<PathBuf>,
    pub elapsed: Duration,
    pub resumed_from: Option<Checkpoint>,
}

/// Owns the pagination loop: runs the effects produced by the core state
/// machine one at a time, feeding fetched pages back in.
pub struct Harvester<'a> {
    config: &'a HarvestConfig,
    fetcher: &'a dyn PageFetcher,
    sink: &'a dyn ProgressSink,
    policy: RetryPolicy,
    writer: ChunkWriter,
    checkpoints: CheckpointStore,
}

impl<'a> Harvester<'a> {
    pub fn new(
        config: &'a HarvestConfig,
        fetcher: &'a dyn PageFetcher,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            config,
            fetcher,
            sink,
            policy: RetryPolicy::from_config(config),
            writer: ChunkWriter::from_config(config),
            checkpoints: CheckpointStore::new(config, Arc::new(String::new)),
        }
    }

    /// Use `clock` for checkpoint timestamps.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.checkpoints = CheckpointStore::new(self.config, clock);
        self
    }

    pub async fn run(&self) -> Result<HarvestReport, HarvestError> {
        self.config.validate()?;
        ensure_output_dir(&self.config.output_dir)?;
        let started = Instant::now();

        let resumed_from = if self.config.checkpoint {
            self.checkpoints.load()?
        } else {
            None
        };
        let state = match &resumed_from {
            Some(checkpoint) => {
                catalog_info!(
                    "resuming at page {} (file {}, {} records already written)",
                    checkpoint.page_number,
                    checkpoint.next_file_index,
                    checkpoint.total_records
                );
                HarvestState::resume(self.config, checkpoint)
            }
            None => HarvestState::new(self.config),
        };

        catalog_info!(
            "harvest start | project {} | domain {} | page size {} | output {:?}",
            self.config.effective_project_id(),
            self.config.domain,
            self.config.page_size,
            self.config.output_dir
        );

        let (mut state, effects) = update(state, Msg::Start);
        let mut queue: VecDeque<Effect> = effects.into();
        let mut files = Vec::new();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::FetchPage {
                    cursor,
                    page_number,
                } => {
                    let msg = match fetch_with_retry(
                        self.fetcher,
                        &self.policy,
                        cursor.as_deref(),
                        page_number,
                        self.sink,
                    )
                    .await
                    {
                        Ok(page) => Msg::PageFetched {
                            items: page.items,
                            next_cursor: page.next_cursor,
                        },
                        Err(err) => Msg::FetchFailed {
                            reason: err.to_string(),
                        },
                    };
                    let (next, effects) = update(state, msg);
                    state = next;
                    queue.extend(effects);
                }
                Effect::PageAccepted(stats) => {
                    self.sink.emit(HarvestEvent::PageFetched {
                        page_number: stats.page_number,
                        received: stats.received,
                        english: stats.english,
                        kept: stats.kept,
                        running_total: stats.running_total,
                    });
                }
                Effect::WriteChunk {
                    file_index,
                    records,
                } => {
                    let path = self
                        .writer
                        .write_chunk(file_index, &records)
                        .map_err(|source| HarvestError::Write { file_index, source })?;
                    self.sink.emit(HarvestEvent::ChunkWritten {
                        file_index,
                        path: path.clone(),
                        records: records.len(),
                    });
                    files.push(path);
                }
                Effect::SaveCheckpoint(checkpoint) => {
                    self.checkpoints.save(&checkpoint)?;
                    self.sink.emit(HarvestEvent::CheckpointSaved {
                        next_file_index: checkpoint.next_file_index,
                    });
                }
                Effect::Finish(summary) => {
                    if self.config.checkpoint {
                        self.checkpoints.clear()?;
                    }
                    let elapsed = started.elapsed();
                    catalog_info!(
                        "harvest done | {} records in {} files | {} pages | {:.1}s",
                        summary.total_records,
                        summary.files_written,
                        summary.pages_fetched,
                        elapsed.as_secs_f64()
                    );
                    return Ok(HarvestReport {
                        summary,
                        files,
                        elapsed,
                        resumed_from,
                    });
                }
                Effect::Abort {
                    page_number,
                    reason,
                    lost_records,
                } => {
                    catalog_error!(
                        "harvest aborted at page {}: {} ({} files kept, {} buffered records lost)",
                        page_number,
                        reason,
                        files.len(),
                        lost_records
                    );
                    return Err(HarvestError::Aborted {
                        page_number,
                        lost_records,
                        reason,
                    });
                }
            }
        }

        catalog_warn!("effect queue drained in phase {:?}", state.phase());
        Err(HarvestError::Incomplete)
    }
}
