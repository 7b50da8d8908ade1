use crate::Record;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Begin the pagination loop from the current cursor.
    Start,
    /// The page requested by the last `Effect::FetchPage` arrived.
    PageFetched {
        items: Vec<Record>,
        next_cursor: Option<String>,
    },
    /// The outstanding page could not be fetched within the retry budget.
    FetchFailed { reason: String },
}
