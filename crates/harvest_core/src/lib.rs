//! Harvest core: configuration, record normalization and the pure pagination
//! state machine driving a catalog harvest.
mod checkpoint;
mod config;
mod effect;
mod msg;
pub mod record;
mod state;
mod update;

pub use checkpoint::Checkpoint;
pub use config::{ConfigError, HarvestConfig, DEFAULT_DOMAIN, DEFAULT_ENDPOINT, DEFAULT_PROJECT_ID};
pub use effect::{Effect, HarvestSummary, PageStats};
pub use msg::Msg;
pub use record::{is_english, normalize, LocaleFilter, Record};
pub use state::{HarvestPhase, HarvestState};
pub use update::update;
