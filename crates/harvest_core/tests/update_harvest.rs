use std::sync::Once;

use harvest_core::{
    update, Checkpoint, Effect, HarvestConfig, HarvestPhase, HarvestState, HarvestSummary,
    LocaleFilter, Msg, Record,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(catalog_logging::initialize_for_tests);
}

fn config(items_per_file: usize) -> HarvestConfig {
    HarvestConfig {
        items_per_file,
        ..HarvestConfig::default()
    }
}

fn item(id: u64) -> Record {
    json!({"id": id, "title_en": format!("t{id}")})
        .as_object()
        .unwrap()
        .clone()
}

fn page(ids: std::ops::RangeInclusive<u64>) -> Vec<Record> {
    ids.map(item).collect()
}

fn fetched(items: Vec<Record>, next: Option<&str>) -> Msg {
    Msg::PageFetched {
        items,
        next_cursor: next.map(str::to_string),
    }
}

fn written(effects: &[Effect]) -> Vec<(u64, Vec<u64>)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::WriteChunk {
                file_index,
                records,
            } => Some((
                *file_index,
                records.iter().map(|r| r["id"].as_u64().unwrap()).collect(),
            )),
            _ => None,
        })
        .collect()
}

/// Feed pages through the state machine, collecting every effect.
fn run(
    mut state: HarvestState,
    pages: Vec<(Vec<Record>, Option<&str>)>,
) -> (HarvestState, Vec<Effect>) {
    let (next, mut all) = update(state, Msg::Start);
    state = next;
    for (items, cursor) in pages {
        let (next, effects) = update(state, fetched(items, cursor));
        state = next;
        all.extend(effects);
    }
    (state, all)
}

#[test]
fn start_requests_first_page_without_cursor() {
    init_logging();
    let (state, effects) = update(HarvestState::new(&config(4)), Msg::Start);
    assert_eq!(state.phase(), HarvestPhase::Fetching);
    assert_eq!(
        effects,
        vec![Effect::FetchPage {
            cursor: None,
            page_number: 1
        }]
    );

    let (_, again) = update(state, Msg::Start);
    assert!(again.is_empty());
}

#[test]
fn three_pages_with_threshold_four_produce_two_files() {
    init_logging();
    let (state, effects) = run(
        HarvestState::new(&config(4)),
        vec![
            (page(1..=2), Some("a")),
            (page(3..=4), Some("b")),
            (page(5..=6), None),
        ],
    );

    assert_eq!(
        written(&effects),
        vec![(1, vec![1, 2, 3, 4]), (2, vec![5, 6])]
    );
    let fetches: Vec<_> = effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::FetchPage {
                cursor,
                page_number,
            } => Some((cursor.clone(), *page_number)),
            _ => None,
        })
        .collect();
    assert_eq!(
        fetches,
        vec![(Some("a".to_string()), 2), (Some("b".to_string()), 3)]
    );
    assert_eq!(state.phase(), HarvestPhase::Done);
    assert_eq!(
        effects.last(),
        Some(&Effect::Finish(HarvestSummary {
            total_records: 6,
            files_written: 2,
            pages_fetched: 3,
            records_received: 6,
        }))
    );
}

#[test]
fn exact_multiple_leaves_no_remainder_file() {
    init_logging();
    let (_, effects) = run(
        HarvestState::new(&config(2)),
        vec![(page(1..=2), Some("a")), (page(3..=4), Some("b")), (Vec::new(), None)],
    );
    assert_eq!(written(&effects), vec![(1, vec![1, 2]), (2, vec![3, 4])]);
    assert!(matches!(
        effects.last(),
        Some(Effect::Finish(HarvestSummary {
            total_records: 4,
            files_written: 2,
            ..
        }))
    ));
}

#[test]
fn one_large_page_flushes_several_files_in_order() {
    init_logging();
    let (_, effects) = run(HarvestState::new(&config(3)), vec![(page(1..=8), None)]);
    assert_eq!(
        written(&effects),
        vec![(1, vec![1, 2, 3]), (2, vec![4, 5, 6]), (3, vec![7, 8])]
    );
}

#[test]
fn empty_first_page_finishes_without_files() {
    init_logging();
    let (state, effects) = run(HarvestState::new(&config(4)), vec![(Vec::new(), Some("x"))]);
    assert_eq!(state.phase(), HarvestPhase::Done);
    assert_eq!(
        effects[1..].to_vec(),
        vec![Effect::Finish(HarvestSummary {
            total_records: 0,
            files_written: 0,
            pages_fetched: 1,
            records_received: 0,
        })]
    );
}

#[test]
fn empty_string_cursor_ends_pagination() {
    init_logging();
    let (state, effects) = run(HarvestState::new(&config(10)), vec![(page(1..=3), Some(""))]);
    assert_eq!(state.phase(), HarvestPhase::Done);
    assert_eq!(written(&effects), vec![(1, vec![1, 2, 3])]);
    assert!(!effects
        .iter()
        .skip(1)
        .any(|effect| matches!(effect, Effect::FetchPage { .. })));
}

#[test]
fn page_stats_report_running_total() {
    init_logging();
    let (_, effects) = run(
        HarvestState::new(&config(3)),
        vec![(page(1..=2), Some("a")), (page(3..=4), None)],
    );
    let stats: Vec<_> = effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::PageAccepted(stats) => {
                Some((stats.page_number, stats.kept, stats.running_total))
            }
            _ => None,
        })
        .collect();
    assert_eq!(stats, vec![(1, 2, 2), (2, 2, 4)]);
}

#[test]
fn fetch_failure_aborts_and_reports_lost_buffer() {
    init_logging();
    let (state, _) = run(HarvestState::new(&config(10)), vec![(page(1..=3), Some("a"))]);
    let (state, effects) = update(
        state,
        Msg::FetchFailed {
            reason: "http status 503".to_string(),
        },
    );
    assert_eq!(state.phase(), HarvestPhase::Aborted);
    assert_eq!(
        effects,
        vec![Effect::Abort {
            page_number: 2,
            reason: "http status 503".to_string(),
            lost_records: 3,
        }]
    );

    let (_, ignored) = update(state, fetched(page(4..=4), None));
    assert!(ignored.is_empty());
}

#[test]
fn english_only_filter_drops_unsignalled_records() {
    init_logging();
    let cfg = HarvestConfig {
        items_per_file: 10,
        locale_filter: LocaleFilter::EnglishOnly,
        ..HarvestConfig::default()
    };
    let arabic = json!({"id": 99, "language": "ar"}).as_object().unwrap().clone();
    let (_, effects) = run(
        HarvestState::new(&cfg),
        vec![(vec![item(1), arabic, item(2)], None)],
    );
    assert_eq!(written(&effects), vec![(1, vec![1, 2])]);
    let Some(Effect::PageAccepted(stats)) = effects.get(1) else {
        panic!("expected page stats, got {effects:?}");
    };
    assert_eq!((stats.received, stats.english, stats.kept), (3, 2, 2));
}

#[test]
fn checkpoints_point_at_oldest_unflushed_record() {
    init_logging();
    let cfg = HarvestConfig {
        items_per_file: 3,
        checkpoint: true,
        ..HarvestConfig::default()
    };
    let (state, effects) = run(
        HarvestState::new(&cfg),
        vec![(page(1..=2), Some("a")), (page(3..=4), Some("b"))],
    );
    let checkpoints: Vec<_> = effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::SaveCheckpoint(checkpoint) => Some(checkpoint.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        checkpoints,
        vec![Checkpoint {
            next_file_index: 2,
            resume_cursor: Some("a".to_string()),
            skip_records: 1,
            page_number: 2,
            total_records: 3,
            saved_utc: None,
        }]
    );
    assert_eq!(state.buffered(), 1);
}

#[test]
fn resumed_state_skips_already_flushed_records() {
    init_logging();
    let cfg = config(3);
    let checkpoint = Checkpoint {
        next_file_index: 2,
        resume_cursor: Some("a".to_string()),
        skip_records: 1,
        page_number: 2,
        total_records: 3,
        saved_utc: None,
    };
    let state = HarvestState::resume(&cfg, &checkpoint);
    let (state, effects) = update(state, Msg::Start);
    assert_eq!(
        effects,
        vec![Effect::FetchPage {
            cursor: Some("a".to_string()),
            page_number: 2
        }]
    );

    let (_, effects) = update(state, fetched(page(3..=4), None));
    assert_eq!(written(&effects), vec![(2, vec![4])]);
    assert!(matches!(
        effects.last(),
        Some(Effect::Finish(HarvestSummary {
            total_records: 4,
            files_written: 2,
            ..
        }))
    ));
}
