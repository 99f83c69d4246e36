//! Session acquisition
//!
//! The crawler never logs in itself. It loads a stored session cookie,
//! verifies it against a page that only renders for signed-in users, and
//! hands the result to the fetcher.

use crate::config::{ClientConfig, Config};
use crate::crawler::fetcher::build_http_client;
use crate::AuthError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable holding the raw `Cookie` header value
pub const SESSION_COOKIE_ENV: &str = "HARVEST_SESSION_COOKIE";

/// Path fragments of pages the source redirects to when a session is invalid
const LOGIN_WALL_MARKERS: [&str; 4] = ["login", "signup", "checkpoint", "authwall"];

/// A verified session, ready to be handed to a fetcher
#[derive(Debug, Clone)]
pub struct SessionHandle {
    cookie_header: Option<String>,
}

impl SessionHandle {
    pub fn new(cookie_header: impl Into<String>) -> Self {
        Self {
            cookie_header: Some(cookie_header.into()),
        }
    }

    /// A handle without credentials, for sources that need none
    pub fn anonymous() -> Self {
        Self { cookie_header: None }
    }

    pub fn cookie_header(&self) -> Option<&str> {
        self.cookie_header.as_deref()
    }
}

/// Capability that yields an authenticated session
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn ensure_authenticated(&self) -> Result<SessionHandle, AuthError>;
}

/// Returns true if `url` points at a login, signup or checkpoint page
pub fn is_login_wall(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    LOGIN_WALL_MARKERS.iter().any(|marker| path.contains(marker))
}

#[derive(Debug, Deserialize)]
struct ExportedCookie {
    name: String,
    value: String,
}

/// Reads a browser cookie export and joins it into a `Cookie` header value
///
/// The export is a JSON array of objects with at least `name` and `value`.
pub fn load_cookie_header(path: &Path) -> Result<String, AuthError> {
    let cookie_error = |message: String| AuthError::CookieFile {
        path: path.display().to_string(),
        message,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| cookie_error(e.to_string()))?;
    let cookies: Vec<ExportedCookie> =
        serde_json::from_str(&raw).map_err(|e| cookie_error(e.to_string()))?;

    if cookies.is_empty() {
        return Err(cookie_error("no cookies in export".to_string()));
    }

    Ok(cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; "))
}

/// Stored-cookie session verified against a check page
#[derive(Debug, Clone)]
pub struct CookieSession {
    check_url: Url,
    cookie_header: String,
    client: ClientConfig,
    attempts: u32,
    retry_delay: Duration,
}

impl CookieSession {
    pub fn new(check_url: Url, cookie_header: impl Into<String>, client: ClientConfig) -> Self {
        Self {
            check_url,
            cookie_header: cookie_header.into(),
            client,
            attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }

    pub fn with_retries(mut self, attempts: u32, retry_delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Builds a session from configuration
    ///
    /// The cookie comes from `HARVEST_SESSION_COOKIE` when set, otherwise
    /// from `session.cookie-file`.
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        let cookie_header = match std::env::var(SESSION_COOKIE_ENV) {
            Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => match &config.session.cookie_file {
                Some(path) => load_cookie_header(Path::new(path))?,
                None => return Err(AuthError::MissingCredentials),
            },
        };

        let check_url = Url::parse(&config.session.check_url)
            .map_err(|e| AuthError::Client(format!("Invalid check-url: {}", e)))?;

        Ok(Self::new(check_url, cookie_header, config.client.clone()).with_retries(
            config.session.auth_retries,
            Duration::from_secs(config.session.auth_retry_delay_secs),
        ))
    }

    async fn verify_once(&self, client: &reqwest::Client) -> Result<(), String> {
        let response = client
            .get(self.check_url.clone())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if is_login_wall(response.url()) {
            return Err(format!("redirected to {}", response.url()));
        }

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        Ok(())
    }
}

#[async_trait]
impl SessionProvider for CookieSession {
    async fn ensure_authenticated(&self) -> Result<SessionHandle, AuthError> {
        let client = build_http_client(&self.client, Some(&self.cookie_header))
            .map_err(AuthError::Client)?;

        let mut reason = String::new();
        for attempt in 1..=self.attempts {
            match self.verify_once(&client).await {
                Ok(()) => {
                    tracing::info!("Session verified against {}", self.check_url);
                    return Ok(SessionHandle::new(self.cookie_header.clone()));
                }
                Err(e) => {
                    tracing::warn!(
                        "Session check {}/{} failed: {}",
                        attempt,
                        self.attempts,
                        e
                    );
                    reason = e;
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(AuthError::Rejected {
            attempts: self.attempts,
            reason,
        })
    }
}
