//! Harvest engine: HTTP paging, retry, chunked persistence and the CSV
//! flattening stage.
mod checkpoint;
mod fetch;
mod flatten;
mod harvest;
mod html;
mod json_stream;
mod persist;
mod product;
mod progress;
mod retry;
mod session;
mod types;
mod writer;

pub use checkpoint::{CheckpointError, CheckpointStore, Clock};
pub use fetch::{ApiPageFetcher, PageFetcher};
pub use flatten::{discover_inputs, flatten, FlattenError, FlattenSettings, FlattenSummary};
pub use harvest::{HarvestError, HarvestReport, Harvester};
pub use html::strip_html;
pub use json_stream::for_each_array_item;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use product::{extract_row, ProductRow, RowError, CSV_HEADERS};
pub use progress::{LogProgressSink, ProgressSink};
pub use retry::{fetch_with_retry, RetryError, RetryPolicy};
pub use session::{HttpSession, SessionSettings};
pub use types::{FailureKind, FetchError, HarvestEvent, Page};
pub use writer::{ChunkWriter, JsonArrayWriter, WriteError};
