//! Lenient markup scanner for section fragments
//!
//! Fragments are HTML, not XML: void elements are left unclosed, attributes
//! may be unquoted or valueless, and end tags may be missing or stray. The
//! scanner tolerates all of that. It only needs to recover the element
//! structure (tags, attributes, text) so the shell can find the controls a
//! fragment declares.

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{DocumentError, Result};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    fn from_start(start: &BytesStart) -> Result<Self> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
        let mut attributes: Vec<(String, String)> = Vec::new();

        let mut attrs = start.html_attributes();
        attrs.with_checks(false);
        for attr in attrs {
            let attr = attr.map_err(|e| DocumentError::Markup(format!("attribute error: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let raw = String::from_utf8_lossy(&attr.value).to_string();
            let value = decode_entities(&raw);
            // First occurrence wins, as in HTML
            if !attributes.iter().any(|(k, _)| *k == key) {
                attributes.push((key, value));
            }
        }

        Ok(Self {
            tag,
            attributes,
            children: Vec::new(),
        })
    }
}

/// Resolve character references one at a time
///
/// Named HTML entities and numeric references are decoded; anything that is
/// not a well-formed, known reference stays literal.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let name_len = tail[1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '#'))
            .unwrap_or(tail.len() - 1);

        if name_len == 0 || !tail[1 + name_len..].starts_with(';') {
            out.push('&');
            rest = &tail[1..];
            continue;
        }

        let reference = &tail[..name_len + 2];
        match unescape_with(reference, resolve_html5_entity) {
            Ok(decoded) => out.push_str(&decoded),
            Err(_) => out.push_str(reference),
        }
        rest = &tail[name_len + 2..];
    }

    out.push_str(rest);
    out
}

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse fragment markup into a forest of nodes
///
/// Unclosed elements are closed at end of input; an end tag closes the
/// nearest open element with the same name and everything opened after it;
/// end tags with no open counterpart are ignored. Whitespace-only text is
/// dropped.
pub fn parse_fragment(markup: &str) -> Result<Vec<MarkupNode>> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = false;

    let mut roots: Vec<MarkupNode> = Vec::new();
    let mut stack: Vec<MarkupElement> = Vec::new();

    fn push_node(stack: &mut [MarkupElement], roots: &mut Vec<MarkupNode>, node: MarkupNode) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    fn close_top(stack: &mut Vec<MarkupElement>, roots: &mut Vec<MarkupNode>) {
        if let Some(done) = stack.pop() {
            push_node(stack, roots, MarkupNode::Element(done));
        }
    }

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let element = MarkupElement::from_start(e)?;
                if is_void(&element.tag) {
                    push_node(&mut stack, &mut roots, MarkupNode::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Ok(Event::Empty(ref e)) => {
                let element = MarkupElement::from_start(e)?;
                push_node(&mut stack, &mut roots, MarkupNode::Element(element));
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if let Some(pos) = stack.iter().rposition(|el| el.tag == name) {
                    while stack.len() > pos {
                        close_top(&mut stack, &mut roots);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let raw = String::from_utf8_lossy(&e).to_string();
                if raw.trim().is_empty() {
                    continue;
                }
                let text = decode_entities(&raw);
                push_node(&mut stack, &mut roots, MarkupNode::Text(text));
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                push_node(&mut stack, &mut roots, MarkupNode::Text(text));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DocumentError::Markup(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
                .into())
            }
            // Comments, doctype, declarations, processing instructions
            Ok(_) => {}
        }
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    Ok(roots)
}

/// Escape text for inclusion in serialized markup
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value for inclusion in double quotes
pub fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &MarkupNode) -> &MarkupElement {
        match node {
            MarkupNode::Element(el) => el,
            MarkupNode::Text(t) => panic!("expected element, got text {:?}", t),
        }
    }

    fn attr<'a>(el: &'a MarkupElement, name: &str) -> Option<&'a str> {
        el.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_parse_simple_fragment() {
        let nodes = parse_fragment(r#"<div id="radio"><h2>Live</h2></div>"#).unwrap();
        assert_eq!(nodes.len(), 1);
        let div = element(&nodes[0]);
        assert_eq!(div.tag, "div");
        assert_eq!(attr(div, "id"), Some("radio"));
        let h2 = element(&div.children[0]);
        assert_eq!(h2.children, vec![MarkupNode::Text("Live".to_string())]);
    }

    #[test]
    fn test_parse_void_and_valueless_attributes() {
        let markup = r#"<audio id="radio-player" controls></audio><img src=logo.png alt="Logo"><p>after</p>"#;
        let nodes = parse_fragment(markup).unwrap();
        assert_eq!(nodes.len(), 3);

        let audio = element(&nodes[0]);
        assert_eq!(attr(audio, "controls"), Some(""));

        let img = element(&nodes[1]);
        assert_eq!(img.tag, "img");
        assert_eq!(attr(img, "src"), Some("logo.png"));
        assert!(img.children.is_empty());

        assert_eq!(element(&nodes[2]).tag, "p");
    }

    #[test]
    fn test_parse_unclosed_elements_are_closed_at_end() {
        let nodes = parse_fragment("<section><ul><li>One<li>Two").unwrap();
        assert_eq!(nodes.len(), 1);
        let section = element(&nodes[0]);
        assert_eq!(section.tag, "section");
        assert_eq!(element(&section.children[0]).tag, "ul");
    }

    #[test]
    fn test_parse_stray_end_tag_is_ignored() {
        let nodes = parse_fragment("</span><p>ok</p>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(element(&nodes[0]).tag, "p");
    }

    #[test]
    fn test_parse_end_tag_closes_intermediate_elements() {
        let nodes = parse_fragment("<div><span>text</div><p>next</p>").unwrap();
        assert_eq!(nodes.len(), 2);
        let div = element(&nodes[0]);
        assert_eq!(element(&div.children[0]).tag, "span");
        assert_eq!(element(&nodes[1]).tag, "p");
    }

    #[test]
    fn test_parse_skips_comments_and_doctype() {
        let nodes = parse_fragment("<!DOCTYPE html><!-- nav --><nav id=\"menu\"></nav>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(attr(element(&nodes[0]), "id"), Some("menu"));
    }

    #[test]
    fn test_parse_unescapes_known_entities_and_keeps_unknown() {
        let nodes = parse_fragment("<p>Rock &amp; Roll&nbsp;Hour</p>").unwrap();
        let p = element(&nodes[0]);
        assert_eq!(
            p.children,
            vec![MarkupNode::Text("Rock & Roll\u{a0}Hour".to_string())]
        );

        let nodes = parse_fragment("<p>&lt;live&gt; &bogus; &#9776; R&B &amp;</p>").unwrap();
        let p = element(&nodes[0]);
        assert_eq!(
            p.children,
            vec![MarkupNode::Text("<live> &bogus; \u{2630} R&B &".to_string())]
        );
    }

    #[test]
    fn test_attribute_entities_resolved_individually() {
        let nodes =
            parse_fragment(r#"<a data-url="https://t.example.com/?a=1&amp;b=2&copy;&nope;">x</a>"#).unwrap();
        assert_eq!(
            attr(element(&nodes[0]), "data-url"),
            Some("https://t.example.com/?a=1&b=2\u{a9}&nope;")
        );
    }

    #[test]
    fn test_decode_entities_edge_cases() {
        assert_eq!(decode_entities("no references"), "no references");
        assert_eq!(decode_entities("trailing &"), "trailing &");
        assert_eq!(decode_entities("&;"), "&;");
        assert_eq!(decode_entities("&amp"), "&amp");
        assert_eq!(decode_entities("&#x41;&#66;"), "AB");
    }

    #[test]
    fn test_escape_helpers() {
        assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_attribute("say \"hi\""), "say &quot;hi&quot;");
    }
}
