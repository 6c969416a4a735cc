use crate::util::html_to_text;

/// Makes feed-supplied HTML safe to store and render as-is.
///
/// Uses ammonia's default policy: structural and formatting markup
/// (paragraphs, lists, tables, links, images, emphasis) is kept; `<script>`
/// and `<style>` are dropped with their contents, `on*` attributes are
/// removed, and URLs outside the http/https/mailto/relative set lose their
/// attribute, which takes care of `javascript:` links.
///
/// Idempotent: sanitizing already-sanitized output returns it unchanged.
/// A single cleaning pass is not always a fixed point (misnested tables and
/// anchors get rebuilt again on reparse, `<pre>` drops one leading newline per
/// parse), so cleaning repeats until the output is stable. Markup that keeps
/// reshaping past `MAX_PASSES` is reduced to its escaped text.
pub fn sanitize_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let mut current = ammonia::clean(html);
    for _ in 1..MAX_PASSES {
        let next = ammonia::clean(&current);
        if next == current {
            return current;
        }
        current = next;
    }

    tracing::debug!("Sanitized HTML did not settle, keeping text only");
    ammonia::clean(&ammonia::clean_text(&html_to_text(&current)))
}

const MAX_PASSES: usize = 8;
