use serde::{Deserialize, Serialize};

/// Restart point written after each successful flush.
///
/// `resume_cursor` is the request cursor of the page holding the oldest
/// unflushed record; `skip_records` of that page's kept records are already
/// on disk. A `None` cursor means the first page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub next_file_index: u64,
    pub resume_cursor: Option<String>,
    pub skip_records: usize,
    pub page_number: u64,
    pub total_records: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_utc: Option<String>,
}
