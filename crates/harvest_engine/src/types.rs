use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use harvest_core::Record;

/// One page of the catalog as returned by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    /// `None` once the API has no further rows.
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    PageFetched {
        page_number: u64,
        received: usize,
        english: usize,
        kept: usize,
        running_total: u64,
    },
    RetryScheduled {
        page_number: u64,
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    ChunkWritten {
        file_index: u64,
        path: PathBuf,
        records: usize,
    },
    CheckpointSaved {
        next_file_index: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Connect,
    Timeout,
    HttpStatus(u16),
    /// The body ended before the advertised length or mid-chunk.
    TruncatedBody,
    Parse,
    Network,
    InvalidRequest,
}

impl FailureKind {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::InvalidRequest)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Connect => write!(f, "connection failed"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::TruncatedBody => write!(f, "truncated response body"),
            FailureKind::Parse => write!(f, "malformed response"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
        }
    }
}
