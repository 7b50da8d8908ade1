use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::LocaleFilter;

pub const DEFAULT_ENDPOINT: &str = "https://prod.fodoole.com/products/list_products/";
pub const DEFAULT_PROJECT_ID: &str = "511714237668";
pub const DEFAULT_DOMAIN: &str = "www.jumia.com.eg";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid endpoint url {url}: {message}")]
    InvalidEndpoint { url: String, message: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} must be a finite number of at least zero")]
    NotFinite(&'static str),
}

/// Immutable harvest settings, built once at startup and shared by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    /// Takes precedence over `project_id` when set.
    pub english_project_id: Option<String>,
    pub domain: String,
    pub page_size: u32,
    pub items_per_file: usize,
    pub force_language: Option<String>,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub transport_retries: u32,
    pub transport_backoff_factor: f64,
    pub pool_max_idle: usize,
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub locale_filter: LocaleFilter,
    pub checkpoint: bool,
    pub log_every_pages: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            project_id: DEFAULT_PROJECT_ID.to_string(),
            english_project_id: None,
            domain: DEFAULT_DOMAIN.to_string(),
            page_size: 5000,
            items_per_file: 50_000,
            force_language: Some("en".to_string()),
            connect_timeout_secs: 8,
            read_timeout_secs: 60,
            max_attempts: 5,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 30_000,
            transport_retries: 6,
            transport_backoff_factor: 0.5,
            pool_max_idle: 32,
            output_dir: PathBuf::from("output"),
            file_prefix: "jumia_en_content".to_string(),
            locale_filter: LocaleFilter::AcceptAll,
            checkpoint: false,
            log_every_pages: 1,
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.endpoint).map_err(|err| ConfigError::InvalidEndpoint {
            url: self.endpoint.clone(),
            message: err.to_string(),
        })?;
        if self.page_size == 0 {
            return Err(ConfigError::Zero("page_size"));
        }
        if self.items_per_file == 0 {
            return Err(ConfigError::Zero("items_per_file"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Zero("max_attempts"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Zero("connect_timeout_secs"));
        }
        if self.read_timeout_secs == 0 {
            return Err(ConfigError::Zero("read_timeout_secs"));
        }
        if !self.transport_backoff_factor.is_finite() || self.transport_backoff_factor < 0.0 {
            return Err(ConfigError::NotFinite("transport_backoff_factor"));
        }
        if self.domain.trim().is_empty() {
            return Err(ConfigError::Empty("domain"));
        }
        if self.effective_project_id().trim().is_empty() {
            return Err(ConfigError::Empty("project_id"));
        }
        if self.file_prefix.trim().is_empty() {
            return Err(ConfigError::Empty("file_prefix"));
        }
        Ok(())
    }

    /// The project actually queried: the English project when configured.
    pub fn effective_project_id(&self) -> &str {
        match self.english_project_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => &self.project_id,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn checkpoint_filename(&self) -> String {
        format!("{}.checkpoint.json", self.file_prefix)
    }
}
