use std::fs;
use std::io;
use std::path::Path;

use anyhow::Context;
use catalog_logging::catalog_info;
use harvest_core::HarvestConfig;
use harvest_engine::FlattenSettings;
use serde::{Deserialize, Serialize};

pub(crate) const SETTINGS_FILENAME: &str = "catalog_harvest.ron";

/// Contents of the optional settings file next to the binary's working dir.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppSettings {
    pub(crate) harvest: HarvestConfig,
    /// Run the CSV stage over the harvest output when present.
    pub(crate) flatten: Option<FlattenSettings>,
}

impl AppSettings {
    /// Missing file means defaults; an unreadable or malformed one is an error.
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                catalog_info!("no settings file at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read settings from {:?}", path))
            }
        };
        let settings = ron::from_str(&content)
            .with_context(|| format!("failed to parse settings from {:?}", path))?;
        catalog_info!("loaded settings from {:?}", path);
        Ok(settings)
    }
}
