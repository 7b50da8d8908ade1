use std::time::Duration;

use catalog_logging::catalog_error;
use harvest_core::HarvestConfig;
use thiserror::Error;

use crate::fetch::PageFetcher;
use crate::progress::ProgressSink;
use crate::{FetchError, HarvestEvent, Page};

/// Bounded, capped exponential backoff around a single page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based):
    /// `min(max_delay, base_delay * 2^(attempt - 1))`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError {
    #[error("page {page_number}: giving up after {attempts} attempts: {source}")]
    Exhausted {
        page_number: u64,
        attempts: u32,
        #[source]
        source: FetchError,
    },
    #[error("page {page_number}: non-retryable failure: {source}")]
    Fatal {
        page_number: u64,
        #[source]
        source: FetchError,
    },
}

/// Fetch one page, retrying transient failures per `policy`.
///
/// A page that still fails after the last attempt is fatal for the harvest;
/// skipping it would silently lose an unknown range of records.
pub async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    policy: &RetryPolicy,
    cursor: Option<&str>,
    page_number: u64,
    sink: &dyn ProgressSink,
) -> Result<Page, RetryError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let err = match fetcher.fetch_page(cursor, page_number).await {
            Ok(page) => return Ok(page),
            Err(err) => err,
        };

        if !err.is_retryable() {
            catalog_error!("page {}: {}", page_number, err);
            return Err(RetryError::Fatal {
                page_number,
                source: err,
            });
        }
        if attempt >= policy.max_attempts {
            catalog_error!(
                "page {}: failed after {} attempts: {}",
                page_number,
                attempt,
                err
            );
            return Err(RetryError::Exhausted {
                page_number,
                attempts: attempt,
                source: err,
            });
        }

        let delay = policy.delay_for(attempt);
        sink.emit(HarvestEvent::RetryScheduled {
            page_number,
            attempt,
            delay,
            reason: err.to_string(),
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
