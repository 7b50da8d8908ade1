use crate::record::{is_english, normalize};
use crate::state::PageSpan;
use crate::{Effect, HarvestPhase, HarvestState, Msg, PageStats, Record};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: HarvestState, msg: Msg) -> (HarvestState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start => {
            if state.phase == HarvestPhase::Idle {
                state.phase = HarvestPhase::Fetching;
                vec![state.fetch_effect()]
            } else {
                Vec::new()
            }
        }
        Msg::PageFetched { items, next_cursor } => {
            if state.phase != HarvestPhase::Fetching {
                return (state, Vec::new());
            }
            state.pages_fetched += 1;
            if items.is_empty() {
                state.finish()
            } else {
                let mut effects = vec![Effect::PageAccepted(state.accumulate(items))];
                state.advance(next_cursor);
                effects.extend(state.flush_full_chunks());
                if state.cursor.is_none() {
                    effects.extend(state.finish());
                } else {
                    state.phase = HarvestPhase::Fetching;
                    effects.push(state.fetch_effect());
                }
                effects
            }
        }
        Msg::FetchFailed { reason } => {
            if state.phase == HarvestPhase::Fetching {
                state.phase = HarvestPhase::Aborted;
                vec![Effect::Abort {
                    page_number: state.page_number,
                    reason,
                    lost_records: state.buffer.len(),
                }]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

impl HarvestState {
    fn fetch_effect(&self) -> Effect {
        Effect::FetchPage {
            cursor: self.cursor.clone(),
            page_number: self.page_number,
        }
    }

    fn accumulate(&mut self, items: Vec<Record>) -> PageStats {
        self.phase = HarvestPhase::Accumulating;
        let received = items.len();
        let english = items.iter().filter(|item| is_english(item)).count();
        let mut kept: Vec<Record> = items
            .iter()
            .filter(|item| self.locale_filter.admits(item))
            .map(normalize)
            .collect();
        self.records_received += received as u64;

        // Records already flushed before the checkpoint this run resumed from.
        let skipped = self.pending_skip.min(kept.len());
        kept.drain(..skipped);
        self.pending_skip = 0;

        let kept_count = kept.len();
        if kept_count > 0 {
            self.spans.push_back(PageSpan {
                cursor: self.cursor.clone(),
                page_number: self.page_number,
                consumed: skipped,
                remaining: kept_count,
            });
            self.buffer.extend(kept);
        }

        PageStats {
            page_number: self.page_number,
            received,
            english,
            kept: kept_count,
            running_total: self.running_total(),
        }
    }

    fn advance(&mut self, next_cursor: Option<String>) {
        self.cursor = next_cursor.filter(|cursor| !cursor.is_empty());
        self.page_number += 1;
    }

    fn flush_full_chunks(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        while self.buffer.len() >= self.items_per_file {
            self.phase = HarvestPhase::Flushing;
            effects.push(self.take_chunk(self.items_per_file));
            if self.checkpointing {
                if let Some(checkpoint) = self.checkpoint() {
                    effects.push(Effect::SaveCheckpoint(checkpoint));
                }
            }
        }
        effects
    }

    fn finish(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.buffer.is_empty() {
            self.phase = HarvestPhase::Flushing;
            effects.push(self.take_chunk(self.buffer.len()));
        }
        self.phase = HarvestPhase::Done;
        effects.push(Effect::Finish(self.summary()));
        effects
    }

    /// Slice `count` records off the front of the buffer into the next file.
    fn take_chunk(&mut self, count: usize) -> Effect {
        let records: Vec<Record> = self.buffer.drain(..count).collect();
        self.consume_spans(count);
        let file_index = self.file_index;
        self.file_index += 1;
        self.flushed_records += records.len() as u64;
        Effect::WriteChunk {
            file_index,
            records,
        }
    }

    fn consume_spans(&mut self, mut count: usize) {
        while count > 0 {
            let Some(span) = self.spans.front_mut() else {
                break;
            };
            let taken = span.remaining.min(count);
            span.remaining -= taken;
            span.consumed += taken;
            count -= taken;
            if span.remaining == 0 {
                self.spans.pop_front();
            }
        }
    }
}
