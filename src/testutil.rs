//! Test doubles for the crawl capabilities
//!
//! In-memory fetcher, pacer and history store that record how they were
//! used, plus HTML and configuration builders shared by unit and
//! integration tests.

use crate::config::{
    ClientConfig, Config, CrawlerConfig, DelayRange, OutputConfig, PacingConfig, SessionConfig,
    SourceConfig,
};
use crate::crawler::{PageContent, PageFetcher, Pacer};
use crate::storage::{CrawlHistory, HistoryResult, HistoryStore};
use crate::FetchError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// Attendee listing template used by `test_config`
pub const TEST_LISTING_URL: &str = "https://example.com/search?event={id}&page={page}";

const EMPTY_PAGE: &str = "<html><body></body></html>";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn canonical(raw: &str) -> String {
    Url::parse(raw)
        .map(String::from)
        .unwrap_or_else(|_| raw.to_string())
}

#[derive(Debug, Default)]
struct Script {
    pages: HashMap<String, String>,
    transient_failures: HashMap<String, u32>,
    permanent_failures: HashSet<String>,
    requests: Vec<String>,
}

/// Fetcher serving scripted pages by URL
///
/// Unscripted URLs return an empty page. Clones share the same script, so
/// a test can keep a handle after moving the fetcher into a coordinator.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Mutex<Script>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: impl Into<String>) -> Self {
        self.set_page(url, body);
        self
    }

    /// The next `times` fetches of `url` fail with a transient fault
    pub fn failing_transient(self, url: &str, times: u32) -> Self {
        lock(&self.script)
            .transient_failures
            .insert(canonical(url), times);
        self
    }

    /// Every fetch of `url` fails with a permanent fault
    pub fn failing_permanent(self, url: &str) -> Self {
        lock(&self.script).permanent_failures.insert(canonical(url));
        self
    }

    pub fn set_page(&self, url: &str, body: impl Into<String>) {
        lock(&self.script).pages.insert(canonical(url), body.into());
    }

    /// Every URL fetched so far, in order
    pub fn requests(&self) -> Vec<String> {
        lock(&self.script).requests.clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        let url = canonical(url);
        lock(&self.script)
            .requests
            .iter()
            .filter(|r| **r == url)
            .count()
    }

    /// Number of requests whose URL contains `fragment`
    pub fn requests_matching(&self, fragment: &str) -> usize {
        lock(&self.script)
            .requests
            .iter()
            .filter(|r| r.contains(fragment))
            .count()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, locator: &Url) -> Result<PageContent, FetchError> {
        let key = locator.as_str().to_string();
        let mut script = lock(&self.script);
        script.requests.push(key.clone());

        if script.permanent_failures.contains(&key) {
            return Err(FetchError::permanent(key, "scripted permanent failure"));
        }

        if let Some(remaining) = script.transient_failures.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::transient(key, "scripted transient failure"));
            }
        }

        let body = script
            .pages
            .get(&key)
            .cloned()
            .unwrap_or_else(|| EMPTY_PAGE.to_string());
        Ok(PageContent::new(locator.clone(), body))
    }
}

/// Pacer that counts calls instead of sleeping
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
    paces: Arc<AtomicU32>,
    long_pauses: Arc<AtomicU32>,
    cooldowns: Arc<AtomicU32>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paces(&self) -> u32 {
        self.paces.load(Ordering::SeqCst)
    }

    pub fn long_pauses(&self) -> u32 {
        self.long_pauses.load(Ordering::SeqCst)
    }

    pub fn cooldowns(&self) -> u32 {
        self.cooldowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pace(&self) {
        self.paces.fetch_add(1, Ordering::SeqCst);
    }

    async fn long_pause(&self) {
        self.long_pauses.fetch_add(1, Ordering::SeqCst);
    }

    async fn cooldown(&self) {
        self.cooldowns.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    stored: Option<CrawlHistory>,
    persists: usize,
}

/// History store kept in memory, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: CrawlHistory) -> Self {
        let store = Self::new();
        lock(&store.state).stored = Some(history);
        store
    }

    pub fn persist_count(&self) -> usize {
        lock(&self.state).persists
    }

    /// The last persisted history
    pub fn snapshot(&self) -> Option<CrawlHistory> {
        lock(&self.state).stored.clone()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> HistoryResult<CrawlHistory> {
        Ok(lock(&self.state).stored.clone().unwrap_or_default())
    }

    fn persist(&mut self, history: &CrawlHistory) -> HistoryResult<()> {
        let mut state = lock(&self.state);
        state.stored = Some(history.clone());
        state.persists += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Listing page linking to `/in/<name>/` for every name
pub fn profile_page<S: AsRef<str>>(names: &[S]) -> String {
    let items: String = names
        .iter()
        .map(|name| {
            format!(
                r#"<li><a href="/in/{0}/">{0}</a></li>"#,
                name.as_ref()
            )
        })
        .collect();
    format!(
        r#"<html><body><a href="/feed/">Home</a><ul>{}</ul></body></html>"#,
        items
    )
}

/// Event listing page linking to `/events/<id>/` for every id
pub fn event_page<S: AsRef<str>>(ids: &[S]) -> String {
    let items: String = ids
        .iter()
        .map(|id| format!(r#"<a href="/events/{}/">Event</a>"#, id.as_ref()))
        .collect();
    format!("<html><body>{}</body></html>", items)
}

/// Page carrying the explicit "no results" marker
pub fn no_results_page() -> String {
    r#"<html><body><div class="no-results">No results found</div></body></html>"#.to_string()
}

/// URL of page `page` of an event's attendee listing under `test_config`
pub fn listing_url(event_id: &str, page: u32) -> String {
    TEST_LISTING_URL
        .replace("{id}", event_id)
        .replace("{page}", &page.to_string())
}

/// Configuration with zero delays and all outputs under `dir`
pub fn test_config(dir: &Path) -> Config {
    let path = |name: &str| dir.join(name).display().to_string();

    Config {
        crawler: CrawlerConfig::default(),
        pacing: PacingConfig {
            page_delay: DelayRange::zero(),
            pause_delay: DelayRange::zero(),
            pause_every_n_discoveries: 100,
            cooldown_delay: DelayRange::zero(),
        },
        source: SourceConfig {
            events_url: None,
            event_href_contains: "/events/".to_string(),
            discovery_timeout_secs: 300,
            listing_url: TEST_LISTING_URL.to_string(),
            profile_selector: "a[href]".to_string(),
            profile_href_contains: "/in/".to_string(),
            no_results_selector: Some(".no-results".to_string()),
        },
        session: SessionConfig {
            check_url: "https://example.com/feed/".to_string(),
            cookie_file: None,
            auth_retries: 1,
            auth_retry_delay_secs: 0,
        },
        client: ClientConfig::default(),
        output: OutputConfig {
            history_path: path("harvest_history.json"),
            csv_path: path("profile_urls.csv"),
            log_path: path("harvest_log.txt"),
        },
    }
}
