use scraper::{Html, Selector};
use url::Url;

use super::client::FeedClient;
use super::error::FeedError;

/// Feed content types, in the order they are looked for in `<link>` tags.
const FEED_LINK_TYPES: [&str; 2] = ["application/rss+xml", "application/atom+xml"];

/// Which rule in the discovery chain produced the feed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryRule {
    /// The URL already looks like a feed (`/feed.xml`, `/rss.xml`, `/atom.xml`, `/feed`)
    Direct,
    /// A known hosting platform with a fixed feed location
    Platform(&'static str),
    /// Found in a `<link type="application/...+xml">` tag on the fetched page
    Scraped,
}

/// A feed URL resolved from a site URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFeed {
    pub feed_url: Url,
    pub rule: DiscoveryRule,
}

/// A rule that does not apply to the URL; the chain moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skip;

/// A network-free discovery rule.
type Strategy = fn(&Url) -> Result<DiscoveredFeed, Skip>;

/// Cheap rules, evaluated in order before the network fallback.
const STRATEGIES: [Strategy; 2] = [direct_feed_url, platform_feed_url];

/// Platform host fragments and the feed path each one serves.
const PLATFORMS: [(&str, PlatformPath); 3] = [
    ("substack.com", PlatformPath::Fixed("/feed")),
    ("medium.com", PlatformPath::PrefixOriginal("/feed")),
    ("blogspot.com", PlatformPath::Fixed("/feeds/posts/default")),
];

#[derive(Debug, Clone, Copy)]
enum PlatformPath {
    /// Replace the path entirely
    Fixed(&'static str),
    /// Prepend to the original path (keeps `@user` or the publication segment)
    PrefixOriginal(&'static str),
}

/// Resolves an absolute site URL to a feed URL.
///
/// Rules are tried in order and the first match wins:
///
/// 1. Direct pattern: the path already names a feed, return it unchanged.
/// 2. Platform: substack, medium and blogspot have fixed feed locations.
/// 3. Scrape: fetch the page and read its `<link>` feed hint.
///
/// # Errors
///
/// - [`FeedError::Fetch`] if the page fetch fails, times out, or returns non-2xx
/// - [`FeedError::FeedNotFound`] if the page carries no feed link
pub async fn discover_feed(client: &FeedClient, url: &Url) -> Result<DiscoveredFeed, FeedError> {
    if let Some(found) = discover_offline(url) {
        tracing::debug!(url = %url, feed_url = %found.feed_url, rule = ?found.rule, "Feed resolved without fetch");
        return Ok(found);
    }

    let bytes = client.get_bytes(url.as_str()).await?;
    let html = String::from_utf8_lossy(&bytes);

    match find_feed_link(&html, url) {
        Some(feed_url) => {
            tracing::debug!(url = %url, feed_url = %feed_url, "Feed link scraped from page");
            Ok(DiscoveredFeed {
                feed_url,
                rule: DiscoveryRule::Scraped,
            })
        }
        None => {
            tracing::info!(url = %url, "No feed link found on page");
            Err(FeedError::FeedNotFound)
        }
    }
}

/// Runs the network-free part of the chain.
pub fn discover_offline(url: &Url) -> Option<DiscoveredFeed> {
    STRATEGIES.iter().find_map(|strategy| strategy(url).ok())
}

fn direct_feed_url(url: &Url) -> Result<DiscoveredFeed, Skip> {
    let path = url.path();
    let is_feed_file = ["/feed.xml", "/rss.xml", "/atom.xml"]
        .iter()
        .any(|suffix| path.ends_with(suffix));
    let is_feed_dir = path.ends_with("/feed") || path.ends_with("/feed/");

    if is_feed_file || is_feed_dir {
        Ok(DiscoveredFeed {
            feed_url: url.clone(),
            rule: DiscoveryRule::Direct,
        })
    } else {
        Err(Skip)
    }
}

fn platform_feed_url(url: &Url) -> Result<DiscoveredFeed, Skip> {
    let host = url.host_str().ok_or(Skip)?;

    let (name, feed_path) = PLATFORMS
        .iter()
        .find(|(fragment, _)| host.contains(fragment))
        .ok_or(Skip)?;

    let path = match feed_path {
        PlatformPath::Fixed(p) => (*p).to_owned(),
        PlatformPath::PrefixOriginal(prefix) => format!("{prefix}{}", url.path()),
    };

    let feed_url = url.join(&path).map_err(|_| Skip)?;
    Ok(DiscoveredFeed {
        feed_url,
        rule: DiscoveryRule::Platform(*name),
    })
}

/// Extracts the feed link from an HTML page.
///
/// Looks for a `<link>` whose `type` is `application/rss+xml`, then for
/// `application/atom+xml`, and resolves its `href` against `page_url` so
/// relative hints come back absolute.
pub fn find_feed_link(html: &str, page_url: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("link[type][href]").ok()?;

    let links: Vec<(String, &str)> = document
        .select(&selector)
        .filter_map(|el| {
            let link_type = el.value().attr("type")?.trim().to_ascii_lowercase();
            let href = el.value().attr("href")?.trim();
            (!href.is_empty()).then_some((link_type, href))
        })
        .collect();

    FEED_LINK_TYPES.iter().find_map(|wanted| {
        links
            .iter()
            .find(|(link_type, _)| link_type == wanted)
            .and_then(|(_, href)| page_url.join(href).ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::client::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn client() -> FeedClient {
        FeedClient::new(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT).unwrap()
    }

    // --- Direct pattern rule ---

    #[test]
    fn test_direct_feed_xml_unchanged() {
        let found = discover_offline(&url("https://example.com/feed.xml")).unwrap();
        assert_eq!(found.feed_url.as_str(), "https://example.com/feed.xml");
        assert_eq!(found.rule, DiscoveryRule::Direct);
    }

    #[test]
    fn test_direct_rss_and_atom_xml() {
        for input in [
            "https://example.com/rss.xml",
            "https://example.com/blog/atom.xml",
        ] {
            let found = discover_offline(&url(input)).unwrap();
            assert_eq!(found.feed_url.as_str(), input);
        }
    }

    #[test]
    fn test_direct_feed_directory_with_and_without_slash() {
        let found = discover_offline(&url("https://example.com/blog/feed")).unwrap();
        assert_eq!(found.rule, DiscoveryRule::Direct);
        let found = discover_offline(&url("https://example.com/blog/feed/")).unwrap();
        assert_eq!(found.feed_url.as_str(), "https://example.com/blog/feed/");
    }

    #[test]
    fn test_direct_rule_wins_over_platform() {
        let found = discover_offline(&url("https://x.substack.com/feed")).unwrap();
        assert_eq!(found.rule, DiscoveryRule::Direct);
        assert_eq!(found.feed_url.as_str(), "https://x.substack.com/feed");
    }

    #[test]
    fn test_feeds_prefix_is_not_direct() {
        assert!(direct_feed_url(&url("https://example.com/feeds")).is_err());
        assert!(direct_feed_url(&url("https://example.com/myfeed.xml")).is_err());
    }

    // --- Platform rules ---

    #[test]
    fn test_substack_post_rewrites_to_feed() {
        let found = discover_offline(&url("https://x.substack.com/p/post")).unwrap();
        assert_eq!(found.feed_url.as_str(), "https://x.substack.com/feed");
        assert_eq!(found.rule, DiscoveryRule::Platform("substack.com"));
    }

    #[test]
    fn test_medium_keeps_user_path() {
        let found = discover_offline(&url("https://medium.com/@someone")).unwrap();
        assert_eq!(found.feed_url.as_str(), "https://medium.com/feed/@someone");
    }

    #[test]
    fn test_medium_publication_path() {
        let found = discover_offline(&url("https://medium.com/some-publication")).unwrap();
        assert_eq!(
            found.feed_url.as_str(),
            "https://medium.com/feed/some-publication"
        );
    }

    #[test]
    fn test_blogspot_default_feed() {
        let found = discover_offline(&url("https://someone.blogspot.com/2024/01/post.html")).unwrap();
        assert_eq!(
            found.feed_url.as_str(),
            "https://someone.blogspot.com/feeds/posts/default"
        );
    }

    #[test]
    fn test_unknown_host_needs_scrape() {
        assert!(discover_offline(&url("https://example.com/blog")).is_none());
    }

    // --- HTML link extraction ---

    #[test]
    fn test_atom_only_hint_resolved_against_page() {
        let html = r#"<html><head>
            <link type="application/atom+xml" href="/f">
        </head><body></body></html>"#;
        let found = find_feed_link(html, &url("https://example.com/blog"));
        assert_eq!(found.unwrap().as_str(), "https://example.com/f");
    }

    #[test]
    fn test_rss_preferred_over_atom() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/atom+xml" href="/atom">
            <link rel="alternate" type="application/rss+xml" href="/rss">
        </head></html>"#;
        let found = find_feed_link(html, &url("https://example.com/"));
        assert_eq!(found.unwrap().as_str(), "https://example.com/rss");
    }

    #[test]
    fn test_relative_href_resolves_against_directory() {
        let html = r#"<link type="application/rss+xml" href="feed.xml">"#;
        let found = find_feed_link(html, &url("https://example.com/blog/"));
        assert_eq!(found.unwrap().as_str(), "https://example.com/blog/feed.xml");
    }

    #[test]
    fn test_protocol_relative_href() {
        let html = r#"<link type="application/rss+xml" href="//cdn.example.com/feed.xml">"#;
        let found = find_feed_link(html, &url("https://example.com/"));
        assert_eq!(found.unwrap().as_str(), "https://cdn.example.com/feed.xml");
    }

    #[test]
    fn test_absolute_href_kept() {
        let html = r#"<link type="application/rss+xml" href="https://feeds.example.org/rss">"#;
        let found = find_feed_link(html, &url("https://example.com/"));
        assert_eq!(found.unwrap().as_str(), "https://feeds.example.org/rss");
    }

    #[test]
    fn test_type_attribute_case_insensitive() {
        let html = r#"<link type="Application/RSS+XML" href="/rss">"#;
        let found = find_feed_link(html, &url("https://example.com/"));
        assert_eq!(found.unwrap().as_str(), "https://example.com/rss");
    }

    #[test]
    fn test_no_feed_link() {
        let html = r#"<html><head><link rel="stylesheet" href="/style.css"></head></html>"#;
        assert!(find_feed_link(html, &url("https://example.com/")).is_none());
    }

    #[test]
    fn test_empty_href_ignored() {
        let html = r#"<link type="application/rss+xml" href="">
            <link type="application/atom+xml" href="/atom">"#;
        let found = find_feed_link(html, &url("https://example.com/"));
        assert_eq!(found.unwrap().as_str(), "https://example.com/atom");
    }

    // --- Scraped fallback over HTTP ---

    #[tokio::test]
    async fn test_scrape_finds_atom_link() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(
                        r#"<html><head><link type="application/atom+xml" href="/f"></head></html>"#,
                    )
                    .insert_header("Content-Type", "text/html"),
            )
            .mount(&mock_server)
            .await;

        let page = url(&format!("{}/blog", mock_server.uri()));
        let found = discover_feed(&client(), &page).await.unwrap();

        assert_eq!(found.rule, DiscoveryRule::Scraped);
        assert_eq!(
            found.feed_url.as_str(),
            format!("{}/f", mock_server.uri())
        );
    }

    #[tokio::test]
    async fn test_scrape_without_link_is_not_found() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>Just a page</body></html>"),
            )
            .mount(&mock_server)
            .await;

        let page = url(&format!("{}/page", mock_server.uri()));
        let result = discover_feed(&client(), &page).await;
        assert!(matches!(result, Err(FeedError::FeedNotFound)));
    }

    #[tokio::test]
    async fn test_scrape_non_success_is_fetch_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let page = url(&format!("{}/page", mock_server.uri()));
        let result = discover_feed(&client(), &page).await;
        assert!(matches!(
            result,
            Err(FeedError::Fetch(crate::feed::FetchError::HttpStatus(503)))
        ));
    }

    #[tokio::test]
    async fn test_scrape_timeout_is_fetch_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let client = FeedClient::new(DEFAULT_USER_AGENT, Duration::from_millis(200)).unwrap();
        let page = url(&format!("{}/page", mock_server.uri()));
        let result = discover_feed(&client, &page).await;
        match result {
            Err(FeedError::Fetch(e)) => assert!(e.is_timeout()),
            other => panic!("Expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_direct_rule_makes_no_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let feed = url(&format!("{}/feed.xml", mock_server.uri()));
        let found = discover_feed(&client(), &feed).await.unwrap();
        assert_eq!(found.feed_url, feed);
    }
}
