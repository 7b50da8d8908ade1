use std::collections::VecDeque;

use crate::{Checkpoint, HarvestConfig, HarvestSummary, LocaleFilter, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HarvestPhase {
    #[default]
    Idle,
    Fetching,
    Accumulating,
    Flushing,
    Done,
    Aborted,
}

/// Where the buffered records of one page came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageSpan {
    pub(crate) cursor: Option<String>,
    pub(crate) page_number: u64,
    /// Kept records of this page already flushed or skipped.
    pub(crate) consumed: usize,
    /// Kept records of this page still in the buffer.
    pub(crate) remaining: usize,
}

/// Harvest session state, owned by the driver and mutated only by `update`.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestState {
    pub(crate) items_per_file: usize,
    pub(crate) locale_filter: LocaleFilter,
    pub(crate) checkpointing: bool,
    pub(crate) phase: HarvestPhase,
    /// Request cursor for the outstanding (or next) page.
    pub(crate) cursor: Option<String>,
    pub(crate) page_number: u64,
    pub(crate) buffer: VecDeque<Record>,
    pub(crate) spans: VecDeque<PageSpan>,
    pub(crate) file_index: u64,
    pub(crate) flushed_records: u64,
    pub(crate) records_received: u64,
    pub(crate) pages_fetched: u64,
    pub(crate) pending_skip: usize,
}

impl HarvestState {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            items_per_file: config.items_per_file.max(1),
            locale_filter: config.locale_filter,
            checkpointing: config.checkpoint,
            phase: HarvestPhase::Idle,
            cursor: None,
            page_number: 1,
            buffer: VecDeque::new(),
            spans: VecDeque::new(),
            file_index: 1,
            flushed_records: 0,
            records_received: 0,
            pages_fetched: 0,
            pending_skip: 0,
        }
    }

    /// Continue a run interrupted after the flush recorded in `checkpoint`.
    pub fn resume(config: &HarvestConfig, checkpoint: &Checkpoint) -> Self {
        Self {
            cursor: checkpoint.resume_cursor.clone(),
            page_number: checkpoint.page_number.max(1),
            file_index: checkpoint.next_file_index.max(1),
            flushed_records: checkpoint.total_records,
            pending_skip: checkpoint.skip_records,
            ..Self::new(config)
        }
    }

    pub fn phase(&self) -> HarvestPhase {
        self.phase
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn next_file_index(&self) -> u64 {
        self.file_index
    }

    pub fn running_total(&self) -> u64 {
        self.flushed_records + self.buffer.len() as u64
    }

    pub fn summary(&self) -> HarvestSummary {
        HarvestSummary {
            total_records: self.flushed_records,
            files_written: self.file_index - 1,
            pages_fetched: self.pages_fetched,
            records_received: self.records_received,
        }
    }

    /// Restart point for the current position, if one is needed.
    ///
    /// Returns `None` when nothing is buffered and no further page exists.
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        let (resume_cursor, page_number, skip_records) = match self.spans.front() {
            Some(span) => (span.cursor.clone(), span.page_number, span.consumed),
            None => (Some(self.cursor.clone()?), self.page_number, 0),
        };
        Some(Checkpoint {
            next_file_index: self.file_index,
            resume_cursor,
            skip_records,
            page_number,
            total_records: self.flushed_records,
            saved_utc: None,
        })
    }
}
