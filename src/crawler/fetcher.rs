//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building HTTP clients that carry the session cookie
//! - GET requests for listing pages
//! - Fault classification into transient and permanent
//! - Detecting redirects onto the login wall

use crate::config::ClientConfig;
use crate::crawler::session::{is_login_wall, SessionHandle};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Rendered content of one fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// URL the content was served from; relative links resolve against it
    pub locator: Url,

    pub body: String,
}

impl PageContent {
    pub fn new(locator: Url, body: impl Into<String>) -> Self {
        Self {
            locator,
            body: body.into(),
        }
    }
}

/// Capability that turns a locator into page content
///
/// The orchestrator owns one fetcher exclusively for the whole run and
/// calls `close` once after the last request.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page
    async fn fetch(&self, locator: &Url) -> Result<PageContent, FetchError>;

    /// Releases the underlying session resources
    async fn close(&self) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Builds an HTTP client with proper configuration
///
/// When `cookie_header` is given it is sent with every request.
///
/// # Example
///
/// ```no_run
/// use attendee_harvest::config::ClientConfig;
/// use attendee_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&ClientConfig::default(), Some("li_at=abc")).unwrap();
/// ```
pub fn build_http_client(config: &ClientConfig, cookie_header: Option<&str>) -> Result<Client, String> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = cookie_header {
        let mut value = HeaderValue::from_str(cookie)
            .map_err(|e| format!("Invalid cookie header: {}", e))?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| e.to_string())
}

/// Page fetcher backed by `reqwest`
///
/// # Fault classification
///
/// | Condition | Fault |
/// |-----------|-------|
/// | Timeout, connection error | Transient |
/// | HTTP 429, HTTP 5xx | Transient |
/// | Body read error | Transient |
/// | Other non-success status | Permanent |
/// | Redirect onto the login wall | Permanent |
/// | Non-HTTP(S) locator, redirect loop | Permanent |
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Opens a fetcher that carries the authenticated session
    pub fn open(config: &ClientConfig, session: &SessionHandle) -> Result<Self, FetchError> {
        let client = build_http_client(config, session.cookie_header())
            .map_err(|e| FetchError::permanent("client", e))?;
        tracing::debug!("Opened HTTP fetcher");
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, locator: &Url) -> Result<PageContent, FetchError> {
        if locator.scheme() != "http" && locator.scheme() != "https" {
            return Err(FetchError::permanent(
                locator.as_str(),
                format!("unsupported scheme {}", locator.scheme()),
            ));
        }

        let response = self
            .client
            .get(locator.clone())
            .send()
            .await
            .map_err(|e| classify_request_error(locator, &e))?;

        let status = response.status();
        let final_url = response.url().clone();

        if is_login_wall(&final_url) {
            return Err(FetchError::permanent(
                locator.as_str(),
                format!("redirected to login wall at {}", final_url),
            ));
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(FetchError::transient(
                locator.as_str(),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        if !status.is_success() {
            return Err(FetchError::permanent(
                locator.as_str(),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::transient(locator.as_str(), e.to_string()))?;

        Ok(PageContent::new(final_url, body))
    }

    async fn close(&self) -> Result<(), FetchError> {
        tracing::debug!("Closed HTTP fetcher");
        Ok(())
    }
}

/// Classifies a request-level error
fn classify_request_error(locator: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::transient(locator.as_str(), "request timeout")
    } else if error.is_connect() {
        FetchError::transient(locator.as_str(), "connection failed")
    } else if error.is_redirect() || error.is_builder() {
        FetchError::permanent(locator.as_str(), error.to_string())
    } else {
        FetchError::transient(locator.as_str(), error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&ClientConfig::default(), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_http_client_with_cookie() {
        let client = build_http_client(&ClientConfig::default(), Some("li_at=abc; JSESSIONID=xyz"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_cookie_rejected() {
        let client = build_http_client(&ClientConfig::default(), Some("bad\ncookie"));
        assert!(client.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_permanent() {
        let fetcher = HttpFetcher::open(&ClientConfig::default(), &SessionHandle::anonymous()).unwrap();
        let err = fetcher
            .fetch(&Url::parse("ftp://example.com/file").unwrap())
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }
}
