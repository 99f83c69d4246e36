//! HTML link extraction
//!
//! This module pulls candidate identifiers out of a fetched listing page:
//! - Links matching the rule's CSS selector
//! - Resolved against the page locator and filtered by substring
//! - Normalized into canonical ids, unique within the page
//!
//! It also recognizes the explicit "no results" marker that terminates a
//! listing walk.

use crate::config::SourceConfig;
use crate::crawler::fetcher::PageContent;
use crate::url::CanonicalId;
use crate::ExtractionError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Declarative rule describing which links on a page are results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    /// CSS selector of candidate link elements
    pub link_selector: String,

    /// Substring the resolved link target must contain
    pub href_contains: String,

    /// CSS selector of the explicit "no results" marker
    pub no_results_selector: Option<String>,
}

impl MatchRule {
    pub fn new(link_selector: impl Into<String>, href_contains: impl Into<String>) -> Self {
        Self {
            link_selector: link_selector.into(),
            href_contains: href_contains.into(),
            no_results_selector: None,
        }
    }

    pub fn with_no_results(mut self, selector: impl Into<String>) -> Self {
        self.no_results_selector = Some(selector.into());
        self
    }

    /// Rule for attendee profile links on an event's listing
    pub fn profiles(source: &SourceConfig) -> Self {
        Self {
            link_selector: source.profile_selector.clone(),
            href_contains: source.profile_href_contains.clone(),
            no_results_selector: source.no_results_selector.clone(),
        }
    }

    /// Rule for event links on the event listing
    pub fn events(source: &SourceConfig) -> Self {
        Self {
            link_selector: "a[href]".to_string(),
            href_contains: source.event_href_contains.clone(),
            no_results_selector: source.no_results_selector.clone(),
        }
    }
}

/// What a single listing page yielded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing<I> {
    /// The page carries the explicit "no results" marker and no matches
    NoResults,

    /// Matching ids in document order, unique within the page
    Links(Vec<I>),
}

impl<I> Listing<I> {
    pub fn is_no_results(&self) -> bool {
        matches!(self, Self::NoResults)
    }
}

/// Extracts the ids a page lists according to `rule`
///
/// Zero matches is `Listing::Links(vec![])`, never an error. Only a rule
/// whose selectors do not parse fails.
///
/// # Example
///
/// ```
/// use attendee_harvest::crawler::{extract_links, Listing, MatchRule, PageContent};
/// use attendee_harvest::ChildId;
/// use url::Url;
///
/// let page = PageContent::new(
///     Url::parse("https://example.com/search?page=1").unwrap(),
///     r#"<a href="/in/alice/">Alice</a><a href="/about">About</a>"#,
/// );
/// let rule = MatchRule::new("a[href]", "/in/");
/// let listing: Listing<ChildId> = extract_links(&page, &rule).unwrap();
/// assert_eq!(
///     listing,
///     Listing::Links(vec![ChildId::parse("https://example.com/in/alice").unwrap()])
/// );
/// ```
pub fn extract_links<I: CanonicalId>(
    content: &PageContent,
    rule: &MatchRule,
) -> Result<Listing<I>, ExtractionError> {
    let link_selector = parse_selector(&rule.link_selector)?;
    let marker_selector = rule
        .no_results_selector
        .as_deref()
        .map(parse_selector)
        .transpose()?;

    let document = Html::parse_document(&content.body);

    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for element in document.select(&link_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(absolute) = resolve_link(href, &content.locator) else {
            continue;
        };

        if !absolute.contains(&rule.href_contains) {
            continue;
        }

        match I::parse(&absolute) {
            Ok(id) => {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
            Err(e) => {
                tracing::debug!("Skipping unparseable link {}: {}", absolute, e);
            }
        }
    }

    if ids.is_empty() {
        if let Some(marker) = marker_selector {
            if document.select(&marker).next().is_some() {
                return Ok(Listing::NoResults);
            }
        }
    }

    Ok(Listing::Links(ids))
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only anchors
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::{ChildId, ParentId};

    fn page(body: &str) -> PageContent {
        PageContent::new(
            Url::parse("https://example.com/search/results?page=2").unwrap(),
            body,
        )
    }

    fn profile_rule() -> MatchRule {
        MatchRule::new("a[href]", "/in/").with_no_results(".no-results")
    }

    fn links(listing: Listing<ChildId>) -> Vec<String> {
        match listing {
            Listing::Links(ids) => ids.iter().map(|id| id.as_str().to_string()).collect(),
            Listing::NoResults => panic!("expected links"),
        }
    }

    #[test]
    fn test_extract_relative_and_absolute() {
        let html = r#"
            <a href="/in/alice">Alice</a>
            <a href="https://example.com/in/bob/">Bob</a>
        "#;
        let result = links(extract_links(&page(html), &profile_rule()).unwrap());
        assert_eq!(
            result,
            vec!["https://example.com/in/alice", "https://example.com/in/bob"]
        );
    }

    #[test]
    fn test_filters_by_substring() {
        let html = r#"
            <a href="/in/alice">Alice</a>
            <a href="/company/acme">Acme</a>
            <a href="/events/1">Event</a>
        "#;
        let result = links(extract_links(&page(html), &profile_rule()).unwrap());
        assert_eq!(result, vec!["https://example.com/in/alice"]);
    }

    #[test]
    fn test_unique_within_page_in_document_order() {
        let html = r#"
            <a href="/in/carol?trk=1">Carol</a>
            <a href="/in/alice">Alice</a>
            <a href="/in/carol?trk=2">Carol again</a>
        "#;
        let result = links(extract_links(&page(html), &profile_rule()).unwrap());
        assert_eq!(
            result,
            vec!["https://example.com/in/carol", "https://example.com/in/alice"]
        );
    }

    #[test]
    fn test_zero_matches_is_empty_links() {
        let html = r#"<html><body><p>Nothing here</p></body></html>"#;
        let listing: Listing<ChildId> = extract_links(&page(html), &profile_rule()).unwrap();
        assert_eq!(listing, Listing::Links(vec![]));
    }

    #[test]
    fn test_no_results_marker() {
        let html = r#"<div class="no-results">No matching people</div>"#;
        let listing: Listing<ChildId> = extract_links(&page(html), &profile_rule()).unwrap();
        assert!(listing.is_no_results());
    }

    #[test]
    fn test_marker_ignored_when_links_present() {
        let html = r#"
            <div class="no-results">Stale banner</div>
            <a href="/in/alice">Alice</a>
        "#;
        let listing: Listing<ChildId> = extract_links(&page(html), &profile_rule()).unwrap();
        assert!(!listing.is_no_results());
    }

    #[test]
    fn test_skips_special_schemes() {
        let html = r##"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:someone@example.com/in/">mail</a>
            <a href="#/in/anchor">anchor</a>
            <a href="/in/file.pdf" download>download</a>
            <a href="/in/alice">Alice</a>
        "##;
        let result = links(extract_links(&page(html), &profile_rule()).unwrap());
        assert_eq!(result, vec!["https://example.com/in/alice"]);
    }

    #[test]
    fn test_custom_selector() {
        let html = r#"
            <a class="attendee" href="/in/alice">Alice</a>
            <a href="/in/sidebar-person">Suggested</a>
        "#;
        let rule = MatchRule::new("a.attendee[href]", "/in/");
        let result = links(extract_links(&page(html), &rule).unwrap());
        assert_eq!(result, vec!["https://example.com/in/alice"]);
    }

    #[test]
    fn test_invalid_selector_is_error() {
        let rule = MatchRule::new("a[[", "/in/");
        let result: Result<Listing<ChildId>, _> = extract_links(&page("<a></a>"), &rule);
        assert!(matches!(
            result,
            Err(ExtractionError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_extract_parent_ids() {
        let html = r#"
            <a href="/events/100/">Meetup</a>
            <a href="/events/200?ref=feed">Conference</a>
        "#;
        let rule = MatchRule::new("a[href]", "/events/");
        let listing: Listing<ParentId> = extract_links(&page(html), &rule).unwrap();
        match listing {
            Listing::Links(ids) => {
                assert_eq!(ids.len(), 2);
                assert_eq!(ids[0].unit_key(), Some("100"));
                assert_eq!(ids[1].unit_key(), Some("200"));
            }
            Listing::NoResults => panic!("expected links"),
        }
    }
}
