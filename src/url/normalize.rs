use crate::UrlError;
use url::Url;

/// Normalizes a URL into the canonical form used for parent and child identity
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace and parse; reject if malformed
/// 2. Accept only HTTP and HTTPS schemes
/// 3. Require a host and lowercase it
/// 4. Normalize path:
///    - Remove empty segments and dot segments (. and ..)
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove the query string (listing links carry volatile tracking
///    parameters such as `miniProfileUrn` or `origin`)
/// 6. Remove fragment
///
/// The result is a fixed point: normalizing an already normalized URL
/// returns it unchanged.
///
/// # Examples
///
/// ```
/// use attendee_harvest::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Example.com/in/jane-doe/?miniProfileUrn=abc").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/in/jane-doe");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
            }
        }
        _ => return Err(UrlError::MissingHost),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_query() {
        let result =
            normalize_url("https://example.com/in/jane?miniProfileUrn=urn%3Ali%3A1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/in/jane");
    }

    #[test]
    fn test_strip_fragment() {
        let result = normalize_url("https://example.com/events/123#about").unwrap();
        assert_eq!(result.as_str(), "https://example.com/events/123");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/events/123/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/events/123");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.com/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_lowercase_host_keeps_path_case() {
        let result = normalize_url("https://EXAMPLE.COM/in/Jane-Doe").unwrap();
        assert_eq!(result.as_str(), "https://example.com/in/Jane-Doe");
    }

    #[test]
    fn test_keeps_www_and_scheme() {
        let result = normalize_url("http://www.example.com/in/jane").unwrap();
        assert_eq!(result.as_str(), "http://www.example.com/in/jane");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url("https://example.com///in//jane///").unwrap();
        assert_eq!(result.as_str(), "https://example.com/in/jane");
    }

    #[test]
    fn test_surrounding_whitespace() {
        let result = normalize_url("  https://example.com/in/jane \n").unwrap();
        assert_eq!(result.as_str(), "https://example.com/in/jane");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://Example.com/events/123/?trk=abc#x",
            "http://example.com",
            "https://example.com/a/../in/jane//",
            "https://example.com:8443/in/%7Ejane/",
        ];

        for input in inputs {
            let once = normalize_url(input).unwrap();
            let twice = normalize_url(once.as_str()).unwrap();
            assert_eq!(once, twice, "Normalization not idempotent for {}", input);
        }
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/file");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        let result = normalize_url("not a url");
        assert!(matches!(result.unwrap_err(), UrlError::Parse(_)));
    }
}
