use feed_rs::parser;
use serde::Serialize;

use super::client::FeedClient;
use super::error::FeedError;
use crate::util::{clean_title, html_to_text};

/// A feed as retrieved from the network: its title and items in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFeed {
    pub title: String,
    pub items: Vec<ParsedItem>,
}

/// One feed entry before deduplication.
///
/// `content_encoded` carries the full body (RSS `content:encoded`, Atom
/// `<content>`), `content` the description/summary, and `content_snippet` a
/// plain-text rendering of whichever of the two is present. Dates are kept as
/// text: `iso_date` is the published time in RFC 3339, `pub_date` the
/// updated time in RFC 2822.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub content_encoded: Option<String>,
    pub content: Option<String>,
    pub content_snippet: Option<String>,
    pub iso_date: Option<String>,
    pub pub_date: Option<String>,
}

/// Fetches `url` and parses it as RSS or Atom.
///
/// # Errors
///
/// - [`FeedError::Fetch`] on network failure, non-2xx status, or timeout
/// - [`FeedError::Parse`] if the body is not a feed
pub async fn fetch_feed(client: &FeedClient, url: &str) -> Result<ParsedFeed, FeedError> {
    let bytes = client.get_bytes(url).await?;
    let feed = parse_feed(&bytes)?;
    tracing::debug!(url = %url, items = feed.items.len(), "Parsed feed");
    Ok(feed)
}

/// Parses raw RSS/Atom bytes. Item order follows the document.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, FeedError> {
    let feed = parser::parse(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;

    let title = feed
        .title
        .map(|t| clean_title(&t.content))
        .unwrap_or_default();

    let items = feed.entries.into_iter().map(into_item).collect();

    Ok(ParsedFeed { title, items })
}

fn into_item(entry: feed_rs::model::Entry) -> ParsedItem {
    let title = entry
        .title
        .map(|t| clean_title(&t.content))
        .filter(|t| !t.is_empty());

    let link = entry
        .links
        .into_iter()
        .map(|l| l.href.trim().to_owned())
        .find(|href| !href.is_empty());

    let content_encoded = entry
        .content
        .and_then(|c| c.body)
        .filter(|body| !body.trim().is_empty());
    let content = entry
        .summary
        .map(|s| s.content)
        .filter(|summary| !summary.trim().is_empty());

    let content_snippet = content
        .as_deref()
        .or(content_encoded.as_deref())
        .map(html_to_text)
        .filter(|text| !text.is_empty());

    ParsedItem {
        title,
        link,
        content_encoded,
        content,
        content_snippet,
        iso_date: entry.published.map(|dt| dt.to_rfc3339()),
        pub_date: entry.updated.map(|dt| dt.to_rfc2822()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::client::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
    use crate::feed::FetchError;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example Blog</title>
    <link>https://example.com</link>
    <item>
      <title>Second</title>
      <link>https://example.com/2</link>
      <description>&lt;p&gt;Short &lt;b&gt;two&lt;/b&gt;&lt;/p&gt;</description>
      <content:encoded><![CDATA[<p>Full body two</p>]]></content:encoded>
      <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>First</title>
      <link>https://example.com/1</link>
      <description>Plain one</description>
    </item>
    <item>
      <title>No link</title>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Blog</title>
  <id>urn:example</id>
  <updated>2024-01-03T00:00:00Z</updated>
  <entry>
    <id>1</id>
    <title>Entry</title>
    <link href="https://example.com/entry"/>
    <updated>2024-01-03T00:00:00Z</updated>
    <summary>Sum</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_title_and_order() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.title, "Example Blog");
        let titles: Vec<_> = feed.items.iter().map(|i| i.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("Second"), Some("First"), Some("No link")]);
    }

    #[test]
    fn test_parse_rss_content_fields() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        let second = &feed.items[0];
        assert_eq!(second.link.as_deref(), Some("https://example.com/2"));
        assert_eq!(
            second.content_encoded.as_deref(),
            Some("<p>Full body two</p>")
        );
        assert_eq!(second.content.as_deref(), Some("<p>Short <b>two</b></p>"));
        assert_eq!(second.content_snippet.as_deref(), Some("Short two"));
        assert!(second.iso_date.as_deref().unwrap().starts_with("2024-01-02T10:00:00"));
    }

    #[test]
    fn test_parse_rss_item_without_link() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.items[2].link, None);
    }

    #[test]
    fn test_parse_rss_item_without_date() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.items[1].iso_date, None);
    }

    #[test]
    fn test_parse_atom() {
        let feed = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(feed.title, "Atom Blog");
        let entry = &feed.items[0];
        assert_eq!(entry.link.as_deref(), Some("https://example.com/entry"));
        assert_eq!(entry.content.as_deref(), Some("Sum"));
        assert!(entry.pub_date.is_some());
    }

    #[test]
    fn test_parse_strips_control_chars_from_title() {
        let rss = "<?xml version=\"1.0\"?>\n<rss version=\"2.0\"><channel>\
            <title>Evil\x1b[31m Feed</title>\
            <item><title>Post</title><link>https://example.com/p</link></item>\
            </channel></rss>";
        let feed = parse_feed(rss.as_bytes()).unwrap();
        assert!(!feed.title.contains('\x1b'));
        assert!(feed.title.contains("Evil"));
    }

    #[test]
    fn test_parse_feed_without_title_is_empty() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item><title>Post</title></item>
</channel></rss>"#;
        let feed = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(feed.title, "");
    }

    #[test]
    fn test_parse_html_is_parse_error() {
        let result = parse_feed(b"<html><body>Hello</body></html>");
        assert!(matches!(result, Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let result = parse_feed(b"<not valid xml");
        assert!(matches!(result, Err(FeedError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_feed_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(RSS)
                    .insert_header("Content-Type", "application/rss+xml"),
            )
            .mount(&mock_server)
            .await;

        let client = FeedClient::new(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT).unwrap();
        let feed = fetch_feed(&client, &format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(feed.items.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_feed_404_is_fetch_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = FeedClient::new(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT).unwrap();
        let result = fetch_feed(&client, &format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(
            result,
            Err(FeedError::Fetch(FetchError::HttpStatus(404)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_feed_malformed_is_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let client = FeedClient::new(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT).unwrap();
        let result = fetch_feed(&client, &format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(FeedError::Parse(_))));
    }
}
