use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use harvest_engine::{
    fetch_with_retry, FailureKind, FetchError, HarvestEvent, Page, PageFetcher, ProgressSink,
    RetryError, RetryPolicy,
};

/// Fails with `kind` for the first `failures` calls, then returns an empty page.
struct FlakyFetcher {
    failures: u32,
    kind: FailureKind,
    calls: AtomicU32,
}

impl FlakyFetcher {
    fn new(failures: u32, kind: FailureKind) -> Self {
        Self {
            failures,
            kind,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PageFetcher for FlakyFetcher {
    async fn fetch_page(&self, _cursor: Option<&str>, _page: u64) -> Result<Page, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(FetchError::new(self.kind.clone(), format!("failure {call}")))
        } else {
            Ok(Page {
                items: Vec::new(),
                next_cursor: None,
            })
        }
    }
}

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<HarvestEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<HarvestEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: HarvestEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn instant_policy() -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

#[test]
fn delay_doubles_from_half_a_second_and_caps_at_thirty() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.delay_for(1), Duration::from_millis(500));
    assert_eq!(policy.delay_for(2), Duration::from_secs(1));
    assert_eq!(policy.delay_for(4), Duration::from_secs(4));
    assert_eq!(policy.delay_for(7), Duration::from_secs(30));
    assert_eq!(policy.delay_for(40), Duration::from_secs(30));
}

#[tokio::test]
async fn succeeds_iff_failures_stay_below_attempt_budget() {
    let policy = instant_policy();
    for failures in 0..=6 {
        let fetcher = FlakyFetcher::new(failures, FailureKind::Timeout);
        let sink = TestSink::default();
        let result = fetch_with_retry(&fetcher, &policy, None, 1, &sink).await;

        if failures < policy.max_attempts {
            assert!(result.is_ok(), "failures={failures}");
            assert_eq!(fetcher.calls(), failures + 1);
            assert_eq!(sink.take().len(), failures as usize);
        } else {
            assert!(result.is_err(), "failures={failures}");
            assert_eq!(fetcher.calls(), policy.max_attempts);
        }
    }
}

#[tokio::test]
async fn permanent_failure_raises_after_max_attempts() {
    let policy = instant_policy();
    let fetcher = FlakyFetcher::new(u32::MAX, FailureKind::HttpStatus(503));
    let sink = TestSink::default();

    let err = fetch_with_retry(&fetcher, &policy, Some("c"), 9, &sink)
        .await
        .unwrap_err();

    assert_eq!(fetcher.calls(), 5);
    match err {
        RetryError::Exhausted {
            page_number,
            attempts,
            source,
        } => {
            assert_eq!(page_number, 9);
            assert_eq!(attempts, 5);
            assert_eq!(source.kind, FailureKind::HttpStatus(503));
        }
        other => panic!("unexpected error {other:?}"),
    }
    let attempts: Vec<_> = sink
        .take()
        .into_iter()
        .map(|event| match event {
            HarvestEvent::RetryScheduled { attempt, .. } => attempt,
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(attempts, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn non_retryable_failure_propagates_immediately() {
    let fetcher = FlakyFetcher::new(u32::MAX, FailureKind::InvalidRequest);
    let sink = TestSink::default();

    let err = fetch_with_retry(&fetcher, &instant_policy(), None, 1, &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, RetryError::Fatal { page_number: 1, .. }));
    assert_eq!(fetcher.calls(), 1);
    assert!(sink.take().is_empty());
}
