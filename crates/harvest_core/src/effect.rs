use crate::{Checkpoint, Record};

/// Side effects requested by `update`; the engine runs them strictly in order
/// and stops at the first failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchPage {
        cursor: Option<String>,
        page_number: u64,
    },
    PageAccepted(PageStats),
    WriteChunk {
        file_index: u64,
        records: Vec<Record>,
    },
    SaveCheckpoint(Checkpoint),
    Finish(HarvestSummary),
    Abort {
        page_number: u64,
        reason: String,
        lost_records: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStats {
    pub page_number: u64,
    pub received: usize,
    pub english: usize,
    pub kept: usize,
    /// Records flushed so far plus records still buffered.
    pub running_total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarvestSummary {
    pub total_records: u64,
    pub files_written: u64,
    pub pages_fetched: u64,
    pub records_received: u64,
}
