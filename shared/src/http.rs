use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{FetchResult, NetworkError};
use crate::fetcher::PageFetcher;
use crate::query::{PageRequest, PageResponse};

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_RESPONSE_BODY_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;
pub const MAX_HEADER_NAME_LENGTH: usize = 256;
pub const MAX_HEADER_VALUE_LENGTH: usize = 8192;
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Base URL of a collection resource, e.g. `https://api.example.org/v1/incidents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self, EndpointError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(Self::invalid(url, "URL cannot be empty"));
        }
        if trimmed.len() > MAX_URL_LENGTH {
            return Err(Self::invalid(
                url,
                &format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            ));
        }

        let parsed = Url::parse(trimmed).map_err(|e| Self::invalid(url, &e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Self::invalid(
                url,
                &format!(
                    "invalid scheme '{}', only 'http' and 'https' are allowed",
                    parsed.scheme()
                ),
            ));
        }
        if parsed.host_str().is_none() {
            return Err(Self::invalid(url, "URL must have a host"));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(Self::invalid(url, "credentials in URL are not allowed"));
        }
        if parsed.fragment().is_some() {
            return Err(Self::invalid(url, "fragments are not allowed"));
        }

        Ok(Self { url: parsed })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The endpoint with the page request appended as query parameters.
    #[must_use]
    pub fn url_for(&self, request: &PageRequest) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().extend_pairs(request.to_query_pairs());
        url
    }

    fn invalid(url: &str, reason: &str) -> EndpointError {
        EndpointError::InvalidUrl {
            url: truncate(url, 100),
            reason: reason.to_string(),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub timeout_ms: u64,
    pub request_id: String,
}

impl HttpRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request was cancelled")]
    Cancelled,

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    Connection(String),
}

impl From<TransportError> for NetworkError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Cancelled => Self::Cancelled,
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Sends GET requests. Implemented by the platform shell's HTTP client.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Deserialize)]
struct PageEnvelope<T> {
    #[serde(alias = "items")]
    data: Vec<T>,
    meta: PageMeta,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(alias = "totalCount", alias = "total_count")]
    total: u64,
    #[serde(default)]
    count: Option<u64>,
}

/// [`PageFetcher`] over a JSON REST endpoint.
///
/// Expects `{"data": [...], "meta": {"total": n, "count": n}}` where `count`
/// is the number of entries on the returned page.
pub struct HttpPageFetcher<T> {
    transport: Arc<dyn HttpTransport>,
    endpoint: Endpoint,
    headers: Vec<(String, String)>,
    timeout_ms: u64,
    max_response_size: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HttpPageFetcher<T> {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_size: MAX_RESPONSE_BODY_SIZE,
            _marker: PhantomData,
        }
    }

    /// Adds a static header sent with every page request. Replaces one with the same name.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, EndpointError> {
        let name = name.into();
        let value = value.into();
        validate_header_name(&name)?;
        validate_header_value(&name, &value)?;
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value));
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, EndpointError> {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if ms == 0 {
            return Err(EndpointError::InvalidTimeout("timeout cannot be zero".into()));
        }
        if ms > MAX_TIMEOUT_MS {
            return Err(EndpointError::InvalidTimeout(format!(
                "timeout exceeds maximum of {MAX_TIMEOUT_MS}ms"
            )));
        }
        self.timeout_ms = ms;
        Ok(self)
    }

    #[must_use]
    pub fn with_max_response_size(mut self, max_bytes: usize) -> Self {
        self.max_response_size = max_bytes.min(MAX_RESPONSE_BODY_SIZE);
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn build_request(&self, request: &PageRequest) -> HttpRequest {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut headers = self.headers.clone();
        headers.push((REQUEST_ID_HEADER.to_string(), request_id.clone()));
        HttpRequest {
            url: self.endpoint.url_for(request),
            headers,
            timeout_ms: self.timeout_ms,
            request_id,
        }
    }
}

impl<T: DeserializeOwned> HttpPageFetcher<T> {
    fn decode(&self, request: &PageRequest, response: &HttpResponse) -> FetchResult<PageResponse<T>> {
        if response.body.len() > self.max_response_size {
            return Err(NetworkError::InvalidResponse);
        }
        if !response.is_success() {
            return Err(NetworkError::from_http_status(
                response.status,
                Some(response.body.as_slice()),
            ));
        }
        if response.body.is_empty() {
            return Err(NetworkError::InvalidResponse);
        }

        let envelope: PageEnvelope<T> = serde_json::from_slice(&response.body).map_err(|e| {
            debug!(error = %e, "page envelope did not decode");
            NetworkError::DecodingFailed
        })?;

        let count = envelope
            .meta
            .count
            .unwrap_or(envelope.data.len() as u64);
        let position = request.offset() + count;
        Ok(PageResponse::new(envelope.data, envelope.meta.total, position))
    }
}

#[async_trait::async_trait]
impl<T> PageFetcher<T> for HttpPageFetcher<T>
where
    T: DeserializeOwned + Send + 'static,
{
    #[instrument(skip_all, fields(page = request.page, endpoint = %self.endpoint.as_str()))]
    async fn fetch_page(&self, request: PageRequest) -> FetchResult<PageResponse<T>> {
        let http_request = self.build_request(&request);
        let request_id = http_request.request_id.clone();
        let response = self.transport.execute(http_request).await?;
        debug!(%request_id, status = response.status, bytes = response.body.len(), "page response");
        self.decode(&request, &response)
    }
}

fn validate_header_name(name: &str) -> Result<(), EndpointError> {
    let invalid = |reason: String| EndpointError::InvalidHeader {
        name: truncate(name, 50),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("header name cannot be empty".into()));
    }
    if name.len() > MAX_HEADER_NAME_LENGTH {
        return Err(invalid(format!(
            "header name exceeds maximum length of {MAX_HEADER_NAME_LENGTH} bytes"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
    {
        return Err(invalid(format!("invalid character '{c}' in header name")));
    }
    let lower = name.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "host" | "content-length" | "transfer-encoding" | "x-request-id"
    ) {
        return Err(invalid("this header is managed automatically".into()));
    }
    Ok(())
}

fn validate_header_value(name: &str, value: &str) -> Result<(), EndpointError> {
    if value.len() > MAX_HEADER_VALUE_LENGTH {
        return Err(EndpointError::InvalidHeader {
            name: truncate(name, 50),
            reason: format!("header value exceeds maximum length of {MAX_HEADER_VALUE_LENGTH} bytes"),
        });
    }
    if value.contains(['\r', '\n', '\0']) {
        return Err(EndpointError::InvalidHeader {
            name: truncate(name, 50),
            reason: "header value contains invalid characters (CR, LF, or NULL)".into(),
        });
    }
    Ok(())
}
