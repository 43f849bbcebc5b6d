//! Blocking HTTP capability shared by the catalog client and the image validator.
//!
//! Callers only see status, the two headers they care about and a body reader,
//! so tests can swap in an in-memory transport.

use std::error::Error;
use std::io::Read;
use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};

const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Response returned by a transport. `body` is consumed lazily so callers can
/// bound how much they read.
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Reads the whole body as (lossy) UTF-8.
    pub fn text(mut self) -> std::io::Result<String> {
        let mut bytes = Vec::new();
        self.body.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

pub trait HttpTransport: Send + Sync {
    fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;

    /// HEAD request following redirects.
    fn head(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT_DEFAULT)
            .pool_idle_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError::Request(get_error(&e)))?;

        Ok(Self { client })
    }

    fn into_response(resp: reqwest::blocking::Response) -> HttpResponse {
        let headers = resp.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        // read the header itself: reqwest reports the body size hint, which is 0 for HEAD
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        HttpResponse {
            status: resp.status().as_u16(),
            content_type,
            content_length,
            body: Box::new(resp),
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        log::debug!("GET {}{}", parsed.host_str().unwrap_or_default(), parsed.path());

        self.client
            .get(parsed)
            .query(query)
            .timeout(timeout)
            .send()
            .map(Self::into_response)
            .map_err(classify)
    }

    fn head(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        self.client
            .head(parsed)
            .timeout(timeout)
            .send()
            .map(Self::into_response)
            .map_err(classify)
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(get_error(&err))
    } else {
        TransportError::Request(get_error(&err))
    }
}

/// Innermost useful message from a reqwest error chain.
pub fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

/// Truncates `text` to at most `max_chars` characters, collapsing newlines.
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
