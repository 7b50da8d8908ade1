use std::time::Duration;

use bytes::Bytes;
use catalog_logging::{catalog_debug, catalog_warn};
use harvest_core::HarvestConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};

use crate::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Transport-level retries on top of the first attempt.
    pub retries: u32,
    pub backoff_factor: f64,
    pub max_backoff: Duration,
    pub status_forcelist: Vec<u16>,
    pub retry_methods: Vec<Method>,
    pub respect_retry_after: bool,
    pub pool_max_idle: usize,
    pub api_key: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(8),
            read_timeout: Duration::from_secs(60),
            retries: 6,
            backoff_factor: 0.5,
            max_backoff: Duration::from_secs(120),
            status_forcelist: vec![429, 500, 502, 503, 504],
            retry_methods: vec![Method::POST],
            respect_retry_after: true,
            pool_max_idle: 32,
            api_key: None,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            retries: config.transport_retries,
            backoff_factor: config.transport_backoff_factor,
            pool_max_idle: config.pool_max_idle,
            api_key: Some(config.api_key.clone()).filter(|key| !key.is_empty()),
            ..Self::default()
        }
    }

    /// Sleep before transport retry number `retry` (1-based). The first retry
    /// goes out immediately.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.backoff_factor * 2f64.powi(exponent);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Pooled HTTP client shared for the whole run, with transport-level retry
/// for connection errors and transient statuses.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: reqwest::Client,
    settings: SessionSettings,
}

impl HttpSession {
    pub fn new(settings: SessionSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = settings.api_key.as_deref() {
            let value = HeaderValue::from_str(key)
                .map_err(|err| FetchError::new(FailureKind::InvalidRequest, err.to_string()))?;
            headers.insert("X-API-Key", value);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .pool_max_idle_per_host(settings.pool_max_idle)
            .default_headers(headers)
            .build()
            .map_err(|err| FetchError::new(FailureKind::InvalidRequest, err.to_string()))?;

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub async fn post(&self, url: &str, body: Bytes) -> Result<Response, reqwest::Error> {
        self.send(Method::POST, url, body).await
    }

    /// Send one logical request. Once retries are exhausted on a status code
    /// the last response is returned as-is for the caller to judge.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Bytes,
    ) -> Result<Response, reqwest::Error> {
        let budget = if self.settings.retry_methods.contains(&method) {
            self.settings.retries
        } else {
            0
        };
        let mut retry = 0;
        loop {
            let result = self
                .client
                .request(method.clone(), url)
                .body(body.clone())
                .send()
                .await;

            let delay = match &result {
                Ok(response) if self.is_retryable_status(response.status()) && retry < budget => {
                    retry += 1;
                    catalog_debug!(
                        "transport retry {}/{} after status {} for {}",
                        retry,
                        budget,
                        response.status(),
                        url
                    );
                    self.retry_after(response)
                        .unwrap_or_else(|| self.settings.backoff(retry))
                }
                Err(err) if is_transport_error(err) && retry < budget => {
                    retry += 1;
                    catalog_warn!("transport retry {}/{} for {}: {}", retry, budget, url, err);
                    self.settings.backoff(retry)
                }
                _ => return result,
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.settings.status_forcelist.contains(&status.as_u16())
    }

    fn retry_after(&self, response: &Response) -> Option<Duration> {
        if !self.settings.respect_retry_after {
            return None;
        }
        if !matches!(
            response.status(),
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::PAYLOAD_TOO_LARGE
        ) {
            return None;
        }
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

fn is_transport_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}
