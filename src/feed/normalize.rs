use url::Url;

use super::error::FeedError;

/// Canonicalizes user input into an absolute http/https URL.
///
/// Input without a scheme gets `https://` prepended before parsing, so
/// `example.com/blog` becomes `https://example.com/blog`. Anything that still
/// fails to parse, has no host, or uses a scheme other than http/https is
/// rejected with [`FeedError::InvalidUrl`] before any network call is made.
pub fn normalize_url(raw: &str) -> Result<Url, FeedError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FeedError::InvalidUrl("empty URL".to_owned()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_owned()
    } else if has_explicit_scheme(trimmed) {
        // Leave other schemes intact so they get rejected below instead of
        // being smuggled through as `https://javascript:...`
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| FeedError::InvalidUrl(format!("{trimmed}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedError::InvalidUrl(format!(
                "unsupported scheme: {scheme} (only http/https allowed)"
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(FeedError::InvalidUrl(format!("{trimmed}: missing host")));
    }

    Ok(url)
}

/// True for inputs like `ftp://host` or `javascript:alert(1)`.
///
/// A bare `host:port` (e.g. `example.com:8080`) is not a scheme: the part
/// after the colon starts with a digit.
fn has_explicit_scheme(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once(':') else {
        return false;
    };
    let valid_scheme = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    let looks_like_port = rest.chars().next().is_some_and(|c| c.is_ascii_digit());
    valid_scheme && !scheme.contains('.') && !looks_like_port
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_https_unchanged() {
        let url = normalize_url("https://example.com/feed.xml").unwrap();
        assert_eq!(url.as_str(), "https://example.com/feed.xml");
    }

    #[test]
    fn test_http_preserved() {
        let url = normalize_url("http://example.com/blog").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_missing_scheme_gets_https() {
        let url = normalize_url("example.com/blog").unwrap();
        assert_eq!(url.as_str(), "https://example.com/blog");
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let url = normalize_url("  x.substack.com  ").unwrap();
        assert_eq!(url.as_str(), "https://x.substack.com/");
    }

    #[test]
    fn test_host_with_port_gets_https() {
        let url = normalize_url("example.com:8080/feed").unwrap();
        assert_eq!(url.as_str(), "https://example.com:8080/feed");
    }

    #[test]
    fn test_uppercase_scheme_accepted() {
        let url = normalize_url("HTTPS://Example.com/").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_unsupported_schemes_rejected() {
        for input in ["ftp://example.com", "file:///etc/passwd", "javascript:alert(1)"] {
            assert!(
                matches!(normalize_url(input), Err(FeedError::InvalidUrl(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(normalize_url(""), Err(FeedError::InvalidUrl(_))));
        assert!(matches!(normalize_url("   "), Err(FeedError::InvalidUrl(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            normalize_url("not a url"),
            Err(FeedError::InvalidUrl(_))
        ));
    }
}
