use crate::url::ParentId;
use crate::{UrlError, UrlResult};
use url::Url;

const PAGE_PLACEHOLDER: &str = "{page}";
const ID_PLACEHOLDER: &str = "{id}";

/// A listing URL template with `{page}` and optional `{id}` placeholders
///
/// ```
/// use attendee_harvest::url::ListingTemplate;
///
/// let template = ListingTemplate::new("https://example.com/search?event={id}&page={page}");
/// let url = template.expand(Some("42"), 3).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/search?event=42&page=3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTemplate(String);

impl ListingTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the template addresses a specific unit via `{id}`
    pub fn is_keyed(&self) -> bool {
        self.0.contains(ID_PLACEHOLDER)
    }

    /// Checks that the template has the required placeholders and expands
    /// to a valid HTTP(S) URL
    pub fn validate(&self, require_id: bool) -> UrlResult<()> {
        if !self.0.contains(PAGE_PLACEHOLDER) {
            return Err(UrlError::Malformed(format!(
                "Listing template '{}' is missing the {} placeholder",
                self.0, PAGE_PLACEHOLDER
            )));
        }

        if require_id && !self.is_keyed() {
            return Err(UrlError::Malformed(format!(
                "Listing template '{}' is missing the {} placeholder",
                self.0, ID_PLACEHOLDER
            )));
        }

        self.expand(Some("0"), 1).map(|_| ())
    }

    /// Expands the template for one page of one unit
    pub fn expand(&self, unit_key: Option<&str>, page: u32) -> UrlResult<Url> {
        let mut expanded = self.0.replace(PAGE_PLACEHOLDER, &page.to_string());

        if self.is_keyed() {
            let key = unit_key.ok_or_else(|| {
                UrlError::Malformed(format!("Listing template '{}' needs a unit key", self.0))
            })?;
            expanded = expanded.replace(ID_PLACEHOLDER, key);
        }

        let url = Url::parse(&expanded).map_err(|e| UrlError::Parse(e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }

        Ok(url)
    }
}

/// Addresses the result pages of a single listing walk
#[derive(Debug, Clone)]
pub struct PageLocator {
    template: ListingTemplate,
    unit_key: Option<String>,
}

impl PageLocator {
    /// Locator for the attendee listing of one parent unit
    pub fn for_parent(template: &ListingTemplate, parent: &ParentId) -> UrlResult<Self> {
        let key = parent.unit_key().ok_or_else(|| {
            UrlError::Malformed(format!("Cannot derive a listing key from {}", parent))
        })?;

        Ok(Self {
            template: template.clone(),
            unit_key: Some(key.to_string()),
        })
    }

    /// Locator for a listing that is not tied to a unit
    pub fn unkeyed(template: &ListingTemplate) -> Self {
        Self {
            template: template.clone(),
            unit_key: None,
        }
    }

    /// Returns the URL of page `page` (1-based)
    pub fn page(&self, page: u32) -> UrlResult<Url> {
        self.template.expand(self.unit_key.as_deref(), page)
    }

    /// Human-readable description for logs and errors
    pub fn describe(&self) -> String {
        match &self.unit_key {
            Some(key) => format!("{} [{}]", self.template.as_str(), key),
            None => self.template.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str =
        "https://example.com/search/results/people/?eventAttending=%5B%22{id}%22%5D&page={page}";

    #[test]
    fn test_expand_keyed() {
        let template = ListingTemplate::new(LISTING);
        let url = template.expand(Some("7123"), 2).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/search/results/people/?eventAttending=%5B%227123%22%5D&page=2"
        );
    }

    #[test]
    fn test_expand_missing_key() {
        let template = ListingTemplate::new(LISTING);
        assert!(template.expand(None, 1).is_err());
    }

    #[test]
    fn test_validate_requires_page() {
        let template = ListingTemplate::new("https://example.com/search?event={id}");
        assert!(template.validate(true).is_err());
    }

    #[test]
    fn test_validate_requires_id_when_asked() {
        let template = ListingTemplate::new("https://example.com/events?page={page}");
        assert!(template.validate(true).is_err());
        assert!(template.validate(false).is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http() {
        let template = ListingTemplate::new("ftp://example.com/?page={page}");
        assert!(template.validate(false).is_err());
    }

    #[test]
    fn test_locator_for_parent() {
        let template = ListingTemplate::new(LISTING);
        let parent = ParentId::parse("https://example.com/events/7123/").unwrap();
        let locator = PageLocator::for_parent(&template, &parent).unwrap();
        let url = locator.page(5).unwrap();
        assert!(url.as_str().contains("%227123%22"));
        assert!(url.as_str().ends_with("page=5"));
    }

    #[test]
    fn test_locator_for_root_parent_fails() {
        let template = ListingTemplate::new(LISTING);
        let parent = ParentId::parse("https://example.com/").unwrap();
        assert!(PageLocator::for_parent(&template, &parent).is_err());
    }

    #[test]
    fn test_unkeyed_locator() {
        let template = ListingTemplate::new("https://example.com/events?page={page}");
        let locator = PageLocator::unkeyed(&template);
        assert_eq!(
            locator.page(1).unwrap().as_str(),
            "https://example.com/events?page=1"
        );
    }
}
