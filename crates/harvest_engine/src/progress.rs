use catalog_logging::{catalog_info, catalog_warn};

use crate::HarvestEvent;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Reports harvest progress through the `catalog_*` log macros.
#[derive(Debug, Clone)]
pub struct LogProgressSink {
    every_pages: u64,
}

impl LogProgressSink {
    pub fn new(every_pages: u64) -> Self {
        Self {
            every_pages: every_pages.max(1),
        }
    }
}

impl Default for LogProgressSink {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::PageFetched {
                page_number,
                received,
                english,
                kept,
                running_total,
            } => {
                if page_number % self.every_pages == 0 {
                    catalog_info!(
                        "page {} | received {} | english {} | kept {} | total {}",
                        page_number,
                        received,
                        english,
                        kept,
                        running_total
                    );
                }
            }
            HarvestEvent::RetryScheduled {
                page_number,
                attempt,
                delay,
                reason,
            } => {
                catalog_warn!(
                    "page {}: {} (attempt {}), retrying in {:.1}s",
                    page_number,
                    reason,
                    attempt,
                    delay.as_secs_f64()
                );
            }
            HarvestEvent::ChunkWritten {
                file_index,
                path,
                records,
            } => {
                catalog_info!("file {} written: {:?} ({} records)", file_index, path, records);
            }
            HarvestEvent::CheckpointSaved { next_file_index } => {
                catalog_info!("checkpoint saved, next file {}", next_file_index);
            }
        }
    }
}
