use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Attendee-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    pub source: SourceConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Pagination and retry policy
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Consecutive pages without new results before a listing is exhausted
    #[serde(rename = "max-consecutive-empty", default = "default_max_consecutive_empty")]
    pub max_consecutive_empty: u32,

    /// In-place retries of a page after a transient fetch fault
    #[serde(rename = "page-retries", default = "default_page_retries")]
    pub page_retries: u32,

    /// Optional cap on pages fetched for a single event
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Run a cooldown after this many attempted events
    #[serde(rename = "cooldown-every-n-parents", default = "default_cooldown_every")]
    pub cooldown_every_n_parents: u32,

    /// Event URLs to crawl in addition to discovered ones
    #[serde(default)]
    pub parents: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_empty: default_max_consecutive_empty(),
            page_retries: default_page_retries(),
            max_pages: None,
            cooldown_every_n_parents: default_cooldown_every(),
            parents: Vec::new(),
        }
    }
}

/// Delay policy between requests
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    /// Randomized delay after every page fetch (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay")]
    pub page_delay: DelayRange,

    /// Randomized long pause after a burst of discoveries (milliseconds)
    #[serde(rename = "pause-delay-ms", default = "default_pause_delay")]
    pub pause_delay: DelayRange,

    /// Number of new profiles that triggers a long pause
    #[serde(
        rename = "pause-every-n-discoveries",
        default = "default_pause_every"
    )]
    pub pause_every_n_discoveries: u32,

    /// Randomized delay applied every `cooldown-every-n-parents` events (milliseconds)
    #[serde(rename = "cooldown-delay-ms", default = "default_page_delay")]
    pub cooldown_delay: DelayRange,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_delay: default_page_delay(),
            pause_delay: default_pause_delay(),
            pause_every_n_discoveries: default_pause_every(),
            cooldown_delay: default_page_delay(),
        }
    }
}

/// Inclusive range of milliseconds, written as `[min, max]` in TOML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "[u64; 2]")]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Draws a uniformly random delay from the range
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }
}

impl From<[u64; 2]> for DelayRange {
    fn from([min_ms, max_ms]: [u64; 2]) -> Self {
        Self { min_ms, max_ms }
    }
}

/// Where events and attendees are listed and how links are recognized
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Paginated event listing (`{page}` placeholder). Discovery is skipped when absent.
    #[serde(rename = "events-url", default)]
    pub events_url: Option<String>,

    /// Substring an event link must contain
    #[serde(rename = "event-href-contains", default = "default_event_href")]
    pub event_href_contains: String,

    /// Wall-clock ceiling for event discovery (seconds)
    #[serde(rename = "discovery-timeout-secs", default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,

    /// Attendee listing of one event (`{id}` and `{page}` placeholders)
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// CSS selector for candidate profile links
    #[serde(rename = "profile-selector", default = "default_link_selector")]
    pub profile_selector: String,

    /// Substring a profile link must contain
    #[serde(rename = "profile-href-contains", default = "default_profile_href")]
    pub profile_href_contains: String,

    /// CSS selector of the explicit "no results" marker
    #[serde(rename = "no-results-selector", default)]
    pub no_results_selector: Option<String>,
}

/// Stored session used to reach the gated source
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Page that only renders for a signed-in session
    #[serde(rename = "check-url")]
    pub check_url: String,

    /// Browser cookie export (JSON array of `{name, value}` objects)
    #[serde(rename = "cookie-file", default)]
    pub cookie_file: Option<String>,

    /// Verification attempts before giving up
    #[serde(rename = "auth-retries", default = "default_auth_retries")]
    pub auth_retries: u32,

    /// Delay between verification attempts (seconds)
    #[serde(rename = "auth-retry-delay-secs", default = "default_auth_retry_delay")]
    pub auth_retry_delay_secs: u64,
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON crawl history
    #[serde(rename = "history-path", default = "default_history_path")]
    pub history_path: String,

    /// Path to the CSV export of (event, profile) pairs
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    /// Path to the session log
    #[serde(rename = "log-path", default = "default_log_path")]
    pub log_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            csv_path: default_csv_path(),
            log_path: default_log_path(),
        }
    }
}

fn default_max_consecutive_empty() -> u32 {
    3
}

fn default_page_retries() -> u32 {
    2
}

fn default_cooldown_every() -> u32 {
    5
}

fn default_page_delay() -> DelayRange {
    DelayRange::new(3_000, 5_000)
}

fn default_pause_delay() -> DelayRange {
    DelayRange::new(180_000, 240_000)
}

fn default_pause_every() -> u32 {
    100
}

fn default_event_href() -> String {
    "/events/".to_string()
}

fn default_discovery_timeout() -> u64 {
    300
}

fn default_link_selector() -> String {
    "a[href]".to_string()
}

fn default_profile_href() -> String {
    "/in/".to_string()
}

fn default_auth_retries() -> u32 {
    3
}

fn default_auth_retry_delay() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("attendee-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_history_path() -> String {
    "harvest_history.json".to_string()
}

fn default_csv_path() -> String {
    "profile_urls.csv".to_string()
}

fn default_log_path() -> String {
    "harvest_log.txt".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_range_sample_within_bounds() {
        let range = DelayRange::new(10, 20);
        for _ in 0..100 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
    }

    #[test]
    fn test_delay_range_degenerate() {
        assert_eq!(DelayRange::new(7, 7).sample(), Duration::from_millis(7));
        assert_eq!(DelayRange::zero().sample(), Duration::ZERO);
    }

    #[test]
    fn test_delay_range_from_array() {
        let range: DelayRange = [3_000, 5_000].into();
        assert_eq!(range, DelayRange::new(3_000, 5_000));
    }
}
