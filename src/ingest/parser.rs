// src/ingest/parser.rs
//! RSS 2.0 / Atom normalization into [`FeedItem`]s.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};

use crate::ingest::sanitize::sanitize;
use crate::ingest::timefmt::{parse_timestamp_ms, relative_label};
use crate::ingest::types::{FeedError, FeedItem, UNKNOWN_FEED, UNTITLED};
use crate::ingest::xml::{parse_document, Document, Element};

pub const CONTENT_MODULE_NS: &str = "http://purl.org/rss/1.0/modules/content/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Rss,
    Atom,
}

impl Dialect {
    /// Any `entry` anywhere makes it Atom, even if `item`s are present too.
    pub fn detect(doc: &Document) -> Self {
        if doc.find("entry").is_some() {
            Dialect::Atom
        } else {
            Dialect::Rss
        }
    }

    fn item_tag(self) -> &'static str {
        match self {
            Dialect::Atom => "entry",
            Dialect::Rss => "item",
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn trimmed_text(el: Option<&Element>) -> Option<String> {
    el.map(Element::text).and_then(non_empty)
}

/// Raw body markup of a content-ish node; inline XHTML is re-serialized.
fn raw_markup(el: &Element) -> String {
    if el.has_element_children() {
        el.inner_markup()
    } else {
        el.text()
    }
}

fn first_markup<'a>(candidates: impl IntoIterator<Item = Option<&'a Element>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(raw_markup)
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

fn feed_title(doc: &Document, dialect: Dialect) -> String {
    let scope = match dialect {
        Dialect::Atom => "feed",
        Dialect::Rss => "channel",
    };
    trimmed_text(doc.find(scope).and_then(|f| f.child("title")))
        .unwrap_or_else(|| UNKNOWN_FEED.to_string())
}

fn date_text(node: &Element, dialect: Dialect) -> Option<String> {
    match dialect {
        Dialect::Atom => {
            trimmed_text(node.find("updated")).or_else(|| trimmed_text(node.find("published")))
        }
        Dialect::Rss => trimmed_text(node.find("pubDate")),
    }
}

fn href_of<'a>(link: &&'a Element) -> Option<&'a str> {
    link.attr("href").map(str::trim).filter(|h| !h.is_empty())
}

fn atom_link(node: &Element) -> Option<String> {
    let links: Vec<&Element> = node.child_elements().filter(|e| e.is("link")).collect();
    links
        .iter()
        .filter(|e| matches!(e.attr("rel"), None | Some("alternate")))
        .find_map(href_of)
        .or_else(|| links.iter().find_map(href_of))
        .map(str::to_string)
}

fn link(node: &Element, dialect: Dialect) -> Option<String> {
    match dialect {
        Dialect::Atom => atom_link(node),
        Dialect::Rss => trimmed_text(node.find("link")),
    }
}

fn body(node: &Element, dialect: Dialect) -> String {
    let raw = match dialect {
        Dialect::Atom => first_markup([node.find("content"), node.find("summary")]),
        Dialect::Rss => {
            let encoded = node
                .descendants()
                .find(|e| e.is_ns(CONTENT_MODULE_NS, "content", "encoded"));
            first_markup([encoded, node.find("description")])
        }
    };
    sanitize(&raw)
}

fn item_from(node: &Element, dialect: Dialect, source: &str, now: DateTime<Utc>) -> FeedItem {
    let timestamp = date_text(node, dialect)
        .as_deref()
        .and_then(parse_timestamp_ms)
        .unwrap_or(0);

    FeedItem {
        source: source.to_string(),
        title: trimmed_text(node.find("title")).unwrap_or_else(|| UNTITLED.to_string()),
        body: body(node, dialect),
        link: link(node, dialect),
        timestamp,
        time: relative_label(timestamp, now),
    }
}

/// Parse a feed with relative labels computed against `now`.
pub fn parse_feed_at(xml: &str, now: DateTime<Utc>) -> Result<Vec<FeedItem>, FeedError> {
    let t0 = std::time::Instant::now();
    let doc = parse_document(xml)?;
    let dialect = Dialect::detect(&doc);
    let source = feed_title(&doc, dialect);

    let tag = dialect.item_tag();
    let items: Vec<FeedItem> = doc
        .elements()
        .filter(|e| e.is(tag))
        .map(|node| item_from(node, dialect, &source, now))
        .collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_items_parsed_total").increment(items.len() as u64);
    tracing::debug!(target: "ingest", ?dialect, %source, items = items.len(), "feed parsed");

    Ok(items)
}

/// Parse an RSS 2.0 or Atom document into items, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, FeedError> {
    parse_feed_at(xml, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn mixed_document_is_atom() {
        let xml = "<root><item><title>i</title></item><entry><title>e</title></entry></root>";
        let items = parse_feed_at(xml, now()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "e");
    }

    #[test]
    fn missing_fields_use_sentinels() {
        let xml = "<rss><channel><item><description>hi</description></item></channel></rss>";
        let items = parse_feed_at(xml, now()).unwrap();
        assert_eq!(items[0].source, UNKNOWN_FEED);
        assert_eq!(items[0].title, UNTITLED);
        assert_eq!(items[0].link, None);
        assert_eq!(items[0].timestamp, 0);
        assert_eq!(items[0].time, "");
    }

    #[test]
    fn atom_prefers_updated_over_published() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>F</title>
            <entry><title>t</title><published>2025-09-06T09:00:00Z</published><updated>2025-09-06T11:00:00Z</updated></entry>
            <entry><title>u</title><published>2025-09-05T12:00:00Z</published></entry></feed>"#;
        let items = parse_feed_at(xml, now()).unwrap();
        assert_eq!(items[0].time, "1h ago");
        assert_eq!(items[1].time, "1d ago");
    }

    #[test]
    fn atom_link_prefers_alternate() {
        let xml = r#"<feed><entry><link rel="self" href="https://x.test/self"/><link rel="alternate" href="https://x.test/post"/></entry></feed>"#;
        let items = parse_feed_at(xml, now()).unwrap();
        assert_eq!(items[0].link.as_deref(), Some("https://x.test/post"));
    }

    #[test]
    fn xhtml_content_drops_anchor_text() {
        let xml = r#"<feed><entry><content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Prose <a href="https://x.test">link text</a> ends.</p></div></content></entry></feed>"#;
        let items = parse_feed_at(xml, now()).unwrap();
        assert_eq!(items[0].body, "Prose ends.");
    }

    #[test]
    fn empty_content_encoded_falls_back_to_description() {
        let xml = r#"<rss xmlns:content="http://purl.org/rss/1.0/modules/content/"><channel><title>C</title>
            <item><content:encoded>  </content:encoded><description>from description</description></item></channel></rss>"#;
        let items = parse_feed_at(xml, now()).unwrap();
        assert_eq!(items[0].body, "from description");
        assert_eq!(items[0].source, "C");
    }

    #[test]
    fn atom_link_in_rss_does_not_count_as_item_link() {
        let xml = r#"<rss xmlns:atom="http://www.w3.org/2005/Atom"><channel><item><atom:link href="https://x.test/self"/><link>https://x.test/a</link></item></channel></rss>"#;
        let items = parse_feed_at(xml, now()).unwrap();
        assert_eq!(items[0].link.as_deref(), Some("https://x.test/a"));
    }
}
