// src/ingest/xml.rs
//! Small, forgiving element tree over quick-xml events.
//!
//! Feeds in the wild carry HTML entities XML doesn't know (`&nbsp;`), stray or
//! mismatched end tags and unclosed elements at EOF. All of those are absorbed
//! here; only input the tokenizer cannot read at all (or a document without any
//! element) is reported as a parse failure.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::ingest::types::FeedError;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Qualified name as written, e.g. `content:encoded`.
    pub name: String,
    /// Namespace URI bound to the element's prefix (or the default namespace).
    pub namespace: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(p, _)| p)
    }

    pub fn local_name(&self) -> &str {
        self.name.split_once(':').map_or(self.name.as_str(), |(_, l)| l)
    }

    /// Unprefixed element named `local` (RSS and Atom core vocabulary).
    pub fn is(&self, local: &str) -> bool {
        self.prefix().is_none() && self.name == local
    }

    /// Element `local` in namespace `ns`. An undeclared prefix still matches on
    /// the conventional `prefix:local` spelling.
    pub fn is_ns(&self, ns: &str, prefix: &str, local: &str) -> bool {
        match self.namespace.as_deref() {
            Some(uri) => uri == ns && self.local_name() == local,
            None => self.prefix() == Some(prefix) && self.local_name() == local,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child_elements(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First direct child named `local`.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(local))
    }

    /// All elements below this one, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.child_elements().rev().collect(),
        }
    }

    /// Direct child first, then any descendant.
    pub fn find(&self, local: &str) -> Option<&Element> {
        self.child(local)
            .or_else(|| self.descendants().find(|e| e.is(local)))
    }

    pub fn has_element_children(&self) -> bool {
        self.child_elements().next().is_some()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for n in &self.children {
            match n {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Children re-serialized as markup (used for inline XHTML bodies).
    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        for n in &self.children {
            write_node(n, &mut out);
        }
        out
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => out.push_str(&html_escape::encode_text(t)),
        Node::Element(e) => {
            out.push('<');
            out.push_str(&e.name);
            for (k, v) in &e.attrs {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(v));
                out.push('"');
            }
            out.push('>');
            for c in &e.children {
                write_node(c, out);
            }
            out.push_str("</");
            out.push_str(&e.name);
            out.push('>');
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        self.stack.extend(el.child_elements().rev());
        Some(el)
    }
}

/// Parsed document; `node` is a nameless container holding the top-level elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    node: Element,
}

impl Document {
    pub fn root(&self) -> Option<&Element> {
        self.node.child_elements().next()
    }

    /// Every element including the root, in document order.
    pub fn elements(&self) -> Descendants<'_> {
        self.node.descendants()
    }

    /// First element named `local` anywhere in the document.
    pub fn find(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(local))
    }
}

fn lossy_decode(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    html_escape::decode_html_entities(&s).into_owned()
}

/// Resolve `prefix` against the element itself, then the open ancestors.
fn resolve_namespace(el: &Element, open: &[Element]) -> Option<String> {
    let key = match el.prefix() {
        Some(p) => Cow::Owned(format!("xmlns:{p}")),
        None => Cow::Borrowed("xmlns"),
    };
    std::iter::once(el)
        .chain(open.iter().rev())
        .find_map(|e| e.attr(&key))
        .filter(|uri| !uri.is_empty())
        .map(str::to_string)
}

fn element_from(start: &BytesStart<'_>, open: &[Element]) -> Element {
    let mut attrs = Vec::new();
    for attr in start.attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => lossy_decode(&attr.value),
        };
        attrs.push((key, value));
    }
    let mut el = Element {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        namespace: None,
        attrs,
        children: Vec::new(),
    };
    el.namespace = resolve_namespace(&el, open);
    el
}

/// Pop the innermost open element and attach it to its parent.
fn close_top(open: &mut Vec<Element>) {
    if open.len() > 1 {
        if let Some(done) = open.pop() {
            if let Some(parent) = open.last_mut() {
                parent.children.push(Node::Element(done));
            }
        }
    }
}

fn push_text(open: &mut [Element], text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(top) = open.last_mut() {
        match top.children.last_mut() {
            Some(Node::Text(prev)) => prev.push_str(&text),
            _ => top.children.push(Node::Text(text)),
        }
    }
}

/// Build an element tree from `xml`.
pub fn parse_document(xml: &str) -> Result<Document, FeedError> {
    let mut reader = Reader::from_str(xml);
    {
        let cfg = reader.config_mut();
        cfg.trim_text(false);
        cfg.check_end_names = false;
        cfg.allow_unmatched_ends = true;
    }

    // open[0] is the document container, never popped.
    let mut open: Vec<Element> = vec![Element::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let el = element_from(&e, &open);
                open.push(el);
            }
            Ok(Event::Empty(e)) => {
                let el = element_from(&e, &open);
                if let Some(top) = open.last_mut() {
                    top.children.push(Node::Element(el));
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                // Stray end tags are ignored; a mismatched one closes everything above its opener.
                if let Some(pos) = open.iter().skip(1).rposition(|el| el.name == name) {
                    let depth = pos + 1;
                    while open.len() > depth {
                        close_top(&mut open);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(t) => t.into_owned(),
                    Err(_) => lossy_decode(&e),
                };
                push_text(&mut open, text);
            }
            Ok(Event::CData(e)) => {
                push_text(&mut open, String::from_utf8_lossy(&e).into_owned());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FeedError::Parse(format!(
                    "XML parse error at position {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    while open.len() > 1 {
        close_top(&mut open);
    }

    let node = open.pop().unwrap_or_default();
    if !node.has_element_children() {
        return Err(FeedError::Parse("document has no root element".into()));
    }
    Ok(Document { node })
}
