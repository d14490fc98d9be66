use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::xml::{XmlDocument, parse_document};

pub const DEFAULT_BASE_URL: &str = "https://boardgamegeek.com/xmlapi2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connection,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("bgg-gateway/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GatewayError::InvalidArgument(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|err| GatewayError::NetworkTransient {
                attempts: 0,
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;
        Ok(TransportResponse { status, body })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() || err.is_request() || err.is_body() {
        TransportErrorKind::Connection
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub min_spacing: Duration,
    pub request_timeout: Duration,
    pub retry_delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_spacing: Duration::from_millis(5000),
            request_timeout: Duration::from_secs(10),
            retry_delays: vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ],
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> usize {
        self.retry_delays.len() + 1
    }
}

enum AttemptFailure {
    Throttled(u16),
    Network(String),
    Status(u16, String),
    Parse(String),
}

impl AttemptFailure {
    fn is_retryable(&self) -> bool {
        matches!(self, AttemptFailure::Throttled(_) | AttemptFailure::Network(_))
    }

    fn into_error(self, attempts: usize) -> GatewayError {
        match self {
            AttemptFailure::Throttled(_) => GatewayError::RateLimited { attempts },
            AttemptFailure::Network(message) => GatewayError::NetworkTransient { attempts, message },
            AttemptFailure::Status(status, message) => GatewayError::ServerError { status, message },
            AttemptFailure::Parse(message) => GatewayError::ParseError(message),
        }
    }

    fn describe(&self) -> String {
        match self {
            AttemptFailure::Throttled(status) => format!("status {status}"),
            AttemptFailure::Network(message) => message.clone(),
            AttemptFailure::Status(status, _) => format!("status {status}"),
            AttemptFailure::Parse(message) => message.clone(),
        }
    }
}

fn is_throttle_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503)
}

pub struct Fetcher {
    transport: Box<dyn Transport>,
    base_url: String,
    policy: RetryPolicy,
    watermark: Mutex<Option<Instant>>,
}

impl Fetcher {
    pub fn new(transport: Box<dyn Transport>, base_url: &str, policy: RetryPolicy) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
            watermark: Mutex::new(None),
        }
    }

    pub fn with_reqwest(base_url: &str, policy: RetryPolicy) -> Result<Self, GatewayError> {
        let transport = ReqwestTransport::new(policy.request_timeout)?;
        Ok(Self::new(Box::new(transport), base_url, policy))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    pub async fn fetch(&self, path: &str) -> Result<XmlDocument, GatewayError> {
        let url = self.url_for(path);
        let mut attempt = 0usize;
        loop {
            self.wait_for_slot().await;
            let failure = match self.attempt(&url).await {
                Ok(document) => return Ok(document),
                Err(failure) => failure,
            };

            let delay = self.policy.retry_delays.get(attempt).copied();
            match delay {
                Some(delay) if failure.is_retryable() => {
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        reason = %failure.describe(),
                        "BGG request failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                _ => {
                    if failure.is_retryable() {
                        warn!(url = %url, attempts = attempt + 1, "BGG request failed after all retries");
                    }
                    return Err(failure.into_error(attempt + 1));
                }
            }
        }
    }

    // The lock is held across the wait so callers queue behind each other.
    async fn wait_for_slot(&self) {
        let mut last = self.watermark.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.policy.min_spacing {
                let wait = self.policy.min_spacing - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "rate limiting BGG request");
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn attempt(&self, url: &str) -> Result<XmlDocument, AttemptFailure> {
        let outcome = timeout(self.policy.request_timeout, self.transport.get(url)).await;
        let response = match outcome {
            Err(_) => {
                return Err(AttemptFailure::Network(format!(
                    "request timed out after {}s",
                    self.policy.request_timeout.as_secs()
                )));
            }
            Ok(Err(err)) => {
                return Err(match err.kind {
                    TransportErrorKind::Timeout | TransportErrorKind::Connection => {
                        AttemptFailure::Network(err.message)
                    }
                    TransportErrorKind::Other => AttemptFailure::Status(0, err.message),
                });
            }
            Ok(Ok(response)) => response,
        };

        if is_throttle_status(response.status) {
            return Err(AttemptFailure::Throttled(response.status));
        }
        if !(200..300).contains(&response.status) {
            let message = if response.body.trim().is_empty() {
                "BGG request failed".to_string()
            } else {
                response.body
            };
            return Err(AttemptFailure::Status(response.status, message));
        }
        parse_document(&response.body).map_err(|err| match err {
            GatewayError::ParseError(message) => AttemptFailure::Parse(message),
            other => AttemptFailure::Parse(other.to_string()),
        })
    }
}
