use bytes::{Bytes, BytesMut};
use catalog_logging::catalog_debug;
use futures_util::StreamExt;
use harvest_core::{HarvestConfig, Record};
use serde::{Deserialize, Serialize};

use crate::session::{HttpSession, SessionSettings};
use crate::{FailureKind, FetchError, Page};

/// Longest slice of an error response body kept in a `FetchError`.
const ERROR_BODY_LIMIT: usize = 500;

#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// One round trip for the page starting at `cursor` (`None` for the first).
    async fn fetch_page(&self, cursor: Option<&str>, page_number: u64)
        -> Result<Page, FetchError>;
}

#[derive(Debug, Serialize)]
struct PageRequest<'a> {
    project_id: &'a str,
    domain: &'a str,
    page_size: u32,
    start_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    items: Option<Vec<Record>>,
    #[serde(default)]
    last_row_key: Option<String>,
}

/// Fetches catalog pages from the remote list-products endpoint.
#[derive(Debug, Clone)]
pub struct ApiPageFetcher {
    session: HttpSession,
    endpoint: String,
    project_id: String,
    domain: String,
    page_size: u32,
    language: Option<String>,
}

impl ApiPageFetcher {
    pub fn new(session: HttpSession, config: &HarvestConfig) -> Self {
        Self {
            session,
            endpoint: config.endpoint.clone(),
            project_id: config.effective_project_id().to_string(),
            domain: config.domain.clone(),
            page_size: config.page_size,
            language: config.force_language.clone(),
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Result<Self, FetchError> {
        let session = HttpSession::new(SessionSettings::from_config(config))?;
        Ok(Self::new(session, config))
    }

    fn request_body(&self, cursor: Option<&str>) -> Result<Bytes, FetchError> {
        let request = PageRequest {
            project_id: &self.project_id,
            domain: &self.domain,
            page_size: self.page_size,
            start_key: cursor,
            language: self.language.as_deref(),
        };
        serde_json::to_vec(&request)
            .map(Bytes::from)
            .map_err(|err| FetchError::new(FailureKind::InvalidRequest, err.to_string()))
    }
}

#[async_trait::async_trait]
impl PageFetcher for ApiPageFetcher {
    async fn fetch_page(
        &self,
        cursor: Option<&str>,
        page_number: u64,
    ) -> Result<Page, FetchError> {
        let body = self.request_body(cursor)?;
        let response = self
            .session
            .post(&self.endpoint, body)
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let text = match response.text().await {
                Ok(text) => text,
                Err(err) => {
                    catalog_debug!("page {}: could not read error body: {}", page_number, err);
                    String::new()
                }
            };
            let snippet: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("HTTP {}: {}", status.as_u16(), snippet),
            ));
        }

        let mut bytes = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| {
                if err.is_timeout() {
                    FetchError::new(FailureKind::Timeout, err.to_string())
                } else {
                    FetchError::new(
                        FailureKind::TruncatedBody,
                        format!("page {page_number}: {err}"),
                    )
                }
            })?;
            bytes.extend_from_slice(&chunk);
        }

        let parsed: PageResponse = serde_json::from_slice(&bytes).map_err(|err| {
            FetchError::new(
                FailureKind::Parse,
                format!("JSON parse error on page {page_number}: {err}"),
            )
        })?;

        Ok(Page {
            items: parsed.items.unwrap_or_default(),
            next_cursor: parsed.last_row_key,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_connect() {
        return FetchError::new(FailureKind::Connect, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidRequest, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
