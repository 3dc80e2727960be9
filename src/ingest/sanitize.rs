// src/ingest/sanitize.rs
//! Turns an embedded HTML fragment into a short plain-text excerpt.
//!
//! The fragment is never rendered or executed; it is treated as a string and
//! reduced with regexes, so scripts in feed bodies are inert by construction.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Display budget for an excerpt, in chars, ellipsis included.
pub const MAX_BODY_CHARS: usize = 180;
pub const ELLIPSIS: &str = "...";

/// Markers of aggregator metadata (e.g. Hacker News "Article URL: ... Points: ...").
const BOILERPLATE_MARKERS: [&str; 2] = ["Article URL:", "Comments URL:"];
const POINTS_MARKER: &str = "Points:";
const COMMENTS_MARKER: &str = "# Comments:";

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Tag body up to the closing `>`; quoted attribute values may contain `>`.
const TAG_BODY: &str = r#"(?:[^>"']|"[^"]*"|'[^']*')*"#;

/// `{open}{TAG_BODY}>{rest}`, compiled once.
fn tag_re(cell: &'static OnceCell<Regex>, open: &str, rest: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(&format!("{open}{TAG_BODY}>{rest}")).expect("static regex"))
}

/// Remove markup from `s`. Anchors, images, scripts and styles go with their content.
///
/// Only `<` followed by a letter, `/`, `!` or `?` opens a tag, so prose such as
/// "latency < 5ms" survives; stray delimiters are dropped by the caller.
fn strip_markup(s: &str) -> String {
    static RE_COMMENTS: OnceCell<Regex> = OnceCell::new();
    static RE_SCRIPTS: OnceCell<Regex> = OnceCell::new();
    static RE_STYLES: OnceCell<Regex> = OnceCell::new();
    static RE_ANCHORS: OnceCell<Regex> = OnceCell::new();
    static RE_OPEN_ANCHOR: OnceCell<Regex> = OnceCell::new();
    static RE_IMAGES: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_BROKEN_TAGS: OnceCell<Regex> = OnceCell::new();

    let out = re(&RE_COMMENTS, r"(?s)<!--.*?-->").replace_all(s, " ");
    let out = tag_re(&RE_SCRIPTS, r"(?is)<script\b", r".*?</script\s*>").replace_all(&out, " ");
    let out = tag_re(&RE_STYLES, r"(?is)<style\b", r".*?</style\s*>").replace_all(&out, " ");
    let out = tag_re(&RE_ANCHORS, r"(?is)<a\b", r".*?</a\s*>").replace_all(&out, " ");
    // An unclosed anchor swallows the rest of the fragment, as a browser would.
    let out = tag_re(&RE_OPEN_ANCHOR, r"(?is)<a\b", r".*$").replace_all(&out, " ");
    let out = tag_re(&RE_IMAGES, r"(?is)<img\b", "").replace_all(&out, " ");
    let out = tag_re(&RE_TAGS, r"(?is)<(?:/?[a-z]|[!?])", "").replace_all(&out, " ");
    // Tags with an unterminated quote.
    re(&RE_BROKEN_TAGS, r"(?is)<(?:/?[a-z]|[!?])[^>]*>")
        .replace_all(&out, " ")
        .into_owned()
}

fn is_boilerplate(text: &str) -> bool {
    BOILERPLATE_MARKERS.iter().any(|m| text.contains(m))
        || (text.contains(POINTS_MARKER) && text.contains(COMMENTS_MARKER))
}

/// Cut to [`MAX_BODY_CHARS`] counting chars, not bytes.
fn truncate_excerpt(text: String) -> String {
    if text.chars().count() <= MAX_BODY_CHARS {
        return text;
    }
    let keep = MAX_BODY_CHARS - ELLIPSIS.chars().count();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Clean a raw HTML fragment into a display excerpt.
///
/// Returns an empty string when nothing meaningful survives, or when the text
/// looks like feed-generator metadata rather than prose.
pub fn sanitize(raw_html: &str) -> String {
    static RE_URLS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();

    if raw_html.trim().is_empty() {
        return String::new();
    }

    // 1) Strip markup, decode entities, strip again (feeds often double-escape HTML)
    let stripped = strip_markup(raw_html);
    let decoded = html_escape::decode_html_entities(&stripped).into_owned();
    let mut text = strip_markup(&decoded);
    text.retain(|c| c != '<' && c != '>');

    // 2) Bare URLs written as text
    let text = re(&RE_URLS, r"https?://\S+").replace_all(&text, "");

    // 3) Collapse whitespace
    let text = re(&RE_WS, r"\s+").replace_all(&text, " ");
    let text = text.trim();

    if text.is_empty() || is_boilerplate(text) {
        return String::new();
    }

    truncate_excerpt(text.to_string())
}
