use scraper::Html;

/// Normalizes a feed-supplied title for storage.
///
/// Drops control characters (including ESC, so ANSI sequences lose their
/// introducer) and collapses every run of whitespace to a single space.
pub fn clean_title(s: &str) -> String {
    s.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders an HTML fragment as plain text.
///
/// Used to derive an item's content snippet. Text inside `<script>` and
/// `<style>` is skipped. Whitespace runs are collapsed and the result is
/// trimmed.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    for node in fragment.root_element().descendants() {
        let Some(chunk) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| NON_TEXT_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            text.push_str(chunk);
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const NON_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];
