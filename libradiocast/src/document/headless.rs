//! In-memory document
//!
//! A small element tree behind a mutex. It understands just enough of the
//! page model for the shell: ids, classes, attributes, text, listeners,
//! media playback state and windows opened outside the shell.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::markup::{self, MarkupNode};
use super::{Document, ElementId, Listener, Query};
use crate::error::{DocumentError, Result};

const ROOT: u64 = 0;

#[derive(Debug, Clone)]
enum Child {
    Element(u64),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Child>,
    parent: Option<u64>,
    listeners: Vec<Listener>,
    /// Markup last assigned with `set_inner_markup`, cleared by any later change below
    source: Option<String>,
    playing: bool,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
            parent: None,
            listeners: Vec::new(),
            source: None,
            playing: false,
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn classes(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    fn set_classes(&mut self, classes: &[&str]) {
        let joined = classes.join(" ");
        self.set_attribute("class", &joined);
    }
}

#[derive(Debug)]
struct Tree {
    nodes: HashMap<u64, Node>,
    next_id: u64,
    opened: Vec<String>,
    native_mime_types: Vec<String>,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT, Node::new("#document"));
        Self {
            nodes,
            next_id: ROOT + 1,
            opened: Vec::new(),
            native_mime_types: Vec::new(),
        }
    }

    fn node(&self, id: u64) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| DocumentError::Detached(id).into())
    }

    fn node_mut(&mut self, id: u64) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| DocumentError::Detached(id).into())
    }

    fn create(&mut self, tag: &str) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, Node::new(tag));
        id
    }

    fn is_attached(&self, id: u64) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ROOT {
                return true;
            }
            current = self.nodes.get(&cur).and_then(|n| n.parent);
        }
        false
    }

    /// Forget cached source markup on `id` and every ancestor
    fn touch(&mut self, id: u64) {
        let mut current = Some(id);
        while let Some(cur) = current {
            match self.nodes.get_mut(&cur) {
                Some(node) => {
                    node.source = None;
                    current = node.parent;
                }
                None => break,
            }
        }
    }

    /// Preorder walk below `root`, excluding `root` itself
    fn descendants(&self, root: u64) -> Vec<u64> {
        let mut out = Vec::new();
        let mut stack: Vec<u64> = Vec::new();
        if let Some(node) = self.nodes.get(&root) {
            stack.extend(node.children.iter().rev().filter_map(element_child));
        }
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev().filter_map(element_child));
            }
        }
        out
    }

    fn remove_subtree(&mut self, id: u64) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.nodes.remove(&cur) {
                stack.extend(node.children.iter().filter_map(element_child));
            }
        }
    }

    fn clear_children(&mut self, id: u64) -> Result<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children.iter().filter_map(element_child) {
            self.remove_subtree(child);
        }
        self.touch(id);
        Ok(())
    }

    fn insert_markup(&mut self, parent: u64, nodes: Vec<MarkupNode>) {
        for node in nodes {
            match node {
                MarkupNode::Text(text) => {
                    if let Some(p) = self.nodes.get_mut(&parent) {
                        p.children.push(Child::Text(text));
                    }
                }
                MarkupNode::Element(el) => {
                    let id = self.create(&el.tag);
                    if let Some(n) = self.nodes.get_mut(&id) {
                        n.attributes = el.attributes;
                        n.parent = Some(parent);
                    }
                    if let Some(p) = self.nodes.get_mut(&parent) {
                        p.children.push(Child::Element(id));
                    }
                    self.insert_markup(id, el.children);
                }
            }
        }
    }

    fn serialize_children(&self, id: u64, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        for child in &node.children {
            match child {
                Child::Text(text) => out.push_str(&markup::escape_text(text)),
                Child::Element(child_id) => self.serialize_element(*child_id, out),
            }
        }
    }

    fn serialize_element(&self, id: u64, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        out.push('<');
        out.push_str(&node.tag);
        for (key, value) in &node.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&markup::escape_attribute(value));
            out.push('"');
        }
        out.push('>');
        if is_void_tag(&node.tag) && node.children.is_empty() {
            return;
        }
        self.serialize_children(id, out);
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }

    fn text_content(&self, id: u64, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        for child in &node.children {
            match child {
                Child::Text(text) => out.push_str(text),
                Child::Element(child_id) => self.text_content(*child_id, out),
            }
        }
    }

    fn matches(&self, id: u64, query: &Query) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        match query {
            Query::Class(class) => node.classes().iter().any(|c| *c == class.as_str()),
            Query::TagWithAttribute { tag, attribute } => {
                node.tag == *tag && node.attribute(attribute).is_some()
            }
        }
    }
}

fn element_child(child: &Child) -> Option<u64> {
    match child {
        Child::Element(id) => Some(*id),
        Child::Text(_) => None,
    }
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "param" | "source" | "track" | "wbr"
    )
}

/// Headless implementation of [`Document`]
#[derive(Debug)]
pub struct HeadlessDocument {
    tree: Mutex<Tree>,
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(Tree::new()),
        }
    }

    /// Create a document whose body is the given host page markup
    pub fn from_markup(host_page: &str) -> Result<Self> {
        let nodes = markup::parse_fragment(host_page)?;
        let document = Self::new();
        document.lock().insert_markup(ROOT, nodes);
        Ok(document)
    }

    /// Declare MIME types the media elements can play without an adaptive engine
    pub fn with_native_mime_types<I, S>(self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().native_mime_types = mime_types.into_iter().map(Into::into).collect();
        self
    }

    /// Root of the document; host page elements hang below it
    pub fn root(&self) -> ElementId {
        ElementId(ROOT)
    }

    /// URLs opened in a new browsing context, oldest first
    pub fn opened_urls(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    /// Whether `play` has been called on the media element
    pub fn is_playing(&self, media: ElementId) -> bool {
        self.lock()
            .nodes
            .get(&media.0)
            .map(|n| n.playing)
            .unwrap_or(false)
    }

    /// Listeners attached directly to an element
    pub fn listeners(&self, element: ElementId) -> Vec<Listener> {
        self.lock()
            .nodes
            .get(&element.0)
            .map(|n| n.listeners.clone())
            .unwrap_or_default()
    }

    /// Whether the handle still refers to an element reachable from the root
    pub fn is_attached(&self, element: ElementId) -> bool {
        self.lock().is_attached(element.0)
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        // A panic while holding the lock leaves the tree structurally valid
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Document for HeadlessDocument {
    fn get_element_by_id(&self, id: &str) -> Option<ElementId> {
        let tree = self.lock();
        tree.descendants(ROOT)
            .into_iter()
            .find(|n| {
                tree.nodes
                    .get(n)
                    .and_then(|node| node.attribute("id"))
                    .is_some_and(|v| v == id)
            })
            .map(ElementId)
    }

    fn query_all(&self, root: Option<ElementId>, query: &Query) -> Vec<ElementId> {
        let tree = self.lock();
        let root = root.map(|r| r.0).unwrap_or(ROOT);
        if !tree.is_attached(root) {
            return Vec::new();
        }
        tree.descendants(root)
            .into_iter()
            .filter(|n| tree.matches(*n, query))
            .map(ElementId)
            .collect()
    }

    fn tag_name(&self, element: ElementId) -> Option<String> {
        self.lock().nodes.get(&element.0).map(|n| n.tag.clone())
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.lock()
            .nodes
            .get(&element.0)
            .and_then(|n| n.attribute(name).map(str::to_string))
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<()> {
        let mut tree = self.lock();
        tree.node_mut(element.0)?
            .set_attribute(&name.to_ascii_lowercase(), value);
        tree.touch(element.0);
        Ok(())
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.lock()
            .nodes
            .get(&element.0)
            .is_some_and(|n| n.classes().contains(&class))
    }

    fn add_class(&self, element: ElementId, class: &str) -> Result<()> {
        let mut tree = self.lock();
        let node = tree.node_mut(element.0)?;
        let mut classes: Vec<String> = node.classes().into_iter().map(str::to_string).collect();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            let refs: Vec<&str> = classes.iter().map(String::as_str).collect();
            node.set_classes(&refs);
            tree.touch(element.0);
        }
        Ok(())
    }

    fn remove_class(&self, element: ElementId, class: &str) -> Result<()> {
        let mut tree = self.lock();
        let node = tree.node_mut(element.0)?;
        let classes: Vec<String> = node.classes().into_iter().map(str::to_string).collect();
        if classes.iter().any(|c| c == class) {
            let refs: Vec<&str> = classes
                .iter()
                .map(String::as_str)
                .filter(|c| *c != class)
                .collect();
            node.set_classes(&refs);
            tree.touch(element.0);
        }
        Ok(())
    }

    fn toggle_class(&self, element: ElementId, class: &str) -> Result<bool> {
        if self.has_class(element, class) {
            self.remove_class(element, class)?;
            Ok(false)
        } else {
            self.add_class(element, class)?;
            Ok(true)
        }
    }

    fn set_inner_markup(&self, element: ElementId, markup_source: &str) -> Result<()> {
        let nodes = markup::parse_fragment(markup_source)?;
        let mut tree = self.lock();
        tree.clear_children(element.0)?;
        tree.insert_markup(element.0, nodes);
        tree.node_mut(element.0)?.source = Some(markup_source.to_string());
        Ok(())
    }

    fn inner_markup(&self, element: ElementId) -> Result<String> {
        let tree = self.lock();
        let node = tree.node(element.0)?;
        if let Some(source) = &node.source {
            return Ok(source.clone());
        }
        let mut out = String::new();
        tree.serialize_children(element.0, &mut out);
        Ok(out)
    }

    fn text_content(&self, element: ElementId) -> Result<String> {
        let tree = self.lock();
        tree.node(element.0)?;
        let mut out = String::new();
        tree.text_content(element.0, &mut out);
        Ok(out)
    }

    fn set_text(&self, element: ElementId, text: &str) -> Result<()> {
        let mut tree = self.lock();
        tree.clear_children(element.0)?;
        tree.node_mut(element.0)?
            .children
            .push(Child::Text(text.to_string()));
        Ok(())
    }

    fn children(&self, element: ElementId) -> Result<Vec<ElementId>> {
        let tree = self.lock();
        Ok(tree
            .node(element.0)?
            .children
            .iter()
            .filter_map(element_child)
            .map(ElementId)
            .collect())
    }

    fn clear_children(&self, element: ElementId) -> Result<()> {
        self.lock().clear_children(element.0)
    }

    fn create_element(&self, tag: &str) -> ElementId {
        ElementId(self.lock().create(tag))
    }

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<()> {
        let mut tree = self.lock();
        tree.node(parent.0)?;
        tree.node(child.0)?;

        let mut ancestor = Some(parent.0);
        while let Some(cur) = ancestor {
            if cur == child.0 {
                return Err(DocumentError::Markup(format!(
                    "cannot append {} inside itself",
                    child
                ))
                .into());
            }
            ancestor = tree.nodes.get(&cur).and_then(|n| n.parent);
        }

        if let Some(old_parent) = tree.node(child.0)?.parent {
            if let Some(old) = tree.nodes.get_mut(&old_parent) {
                old.children
                    .retain(|c| !matches!(c, Child::Element(id) if *id == child.0));
            }
            tree.touch(old_parent);
        }

        tree.node_mut(child.0)?.parent = Some(parent.0);
        tree.node_mut(parent.0)?
            .children
            .push(Child::Element(child.0));
        tree.touch(parent.0);
        Ok(())
    }

    fn add_listener(&self, element: ElementId, listener: Listener) -> Result<()> {
        self.lock().node_mut(element.0)?.listeners.push(listener);
        Ok(())
    }

    fn listeners_on_path(&self, element: ElementId) -> Vec<(ElementId, Listener)> {
        let tree = self.lock();
        let mut out = Vec::new();
        let mut current = Some(element.0);
        while let Some(cur) = current {
            let Some(node) = tree.nodes.get(&cur) else {
                break;
            };
            out.extend(node.listeners.iter().cloned().map(|l| (ElementId(cur), l)));
            current = node.parent;
        }
        out
    }

    fn can_play_type(&self, media: ElementId, mime_type: &str) -> bool {
        let tree = self.lock();
        let is_media = tree
            .nodes
            .get(&media.0)
            .is_some_and(|n| n.tag == "audio" || n.tag == "video");
        is_media && tree.native_mime_types.iter().any(|m| m == mime_type)
    }

    fn play(&self, media: ElementId) -> Result<()> {
        self.lock().node_mut(media.0)?.playing = true;
        Ok(())
    }

    fn open_in_new_context(&self, url: &str) {
        self.lock().opened.push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ids;

    const HOST: &str = r##"
        <header><button id="burger">Menu</button></header>
        <nav id="menu">
            <a href="#" data-section="section-home">Home</a>
            <a href="#" data-section="section-radio">Radio</a>
            <a href="#">Plain link</a>
        </nav>
        <div id="overlay"></div>
        <main id="content"></main>
    "##;

    #[test]
    fn test_from_markup_exposes_host_elements() {
        let doc = HeadlessDocument::from_markup(HOST).unwrap();
        for id in [ids::BURGER, ids::MENU, ids::OVERLAY, ids::CONTENT] {
            assert!(doc.get_element_by_id(id).is_some(), "missing #{}", id);
        }
        assert!(doc.get_element_by_id(ids::RADIO_PLAYER).is_none());
    }

    #[test]
    fn test_query_tag_with_attribute_within_root() {
        let doc = HeadlessDocument::from_markup(HOST).unwrap();
        let menu = doc.get_element_by_id(ids::MENU).unwrap();
        let links = doc.query_all(Some(menu), &Query::tag_with_attribute("a", "data-section"));
        assert_eq!(links.len(), 2);
        assert_eq!(
            doc.attribute(links[1], "data-section").as_deref(),
            Some("section-radio")
        );
    }

    #[test]
    fn test_set_inner_markup_replaces_children_and_detaches_old() {
        let doc = HeadlessDocument::from_markup(HOST).unwrap();
        let content = doc.get_element_by_id(ids::CONTENT).unwrap();

        doc.set_inner_markup(content, r#"<div id="programme-grid"></div>"#).unwrap();
        let grid = doc.get_element_by_id(ids::PROGRAMME_GRID).unwrap();

        doc.set_inner_markup(content, "<p>Home</p>").unwrap();
        assert!(doc.get_element_by_id(ids::PROGRAMME_GRID).is_none());
        assert!(doc.set_attribute(grid, "class", "x").is_err());
        assert_eq!(doc.inner_markup(content).unwrap(), "<p>Home</p>");
    }

    #[test]
    fn test_inner_markup_serializes_after_mutation() {
        let doc = HeadlessDocument::from_markup(HOST).unwrap();
        let content = doc.get_element_by_id(ids::CONTENT).unwrap();
        doc.set_inner_markup(content, "<iframe id='programme-frame'></iframe>").unwrap();

        let frame = doc.get_element_by_id(ids::PROGRAMME_FRAME).unwrap();
        doc.set_attribute(frame, "src", "https://target.example.com/x?a=1&b=2")
            .unwrap();

        assert_eq!(
            doc.inner_markup(content).unwrap(),
            r#"<iframe id="programme-frame" src="https://target.example.com/x?a=1&amp;b=2"></iframe>"#
        );
    }

    #[test]
    fn test_entities_survive_serialization_after_mutation() {
        let doc = HeadlessDocument::from_markup(HOST).unwrap();
        let content = doc.get_element_by_id(ids::CONTENT).unwrap();
        doc.set_inner_markup(
            content,
            r#"<p>Rock &amp; Roll&nbsp;Hour</p><iframe id="programme-frame"></iframe>"#,
        )
        .unwrap();

        let frame = doc.get_element_by_id(ids::PROGRAMME_FRAME).unwrap();
        doc.set_attribute(frame, "src", "https://target.example.com/rock").unwrap();

        assert_eq!(doc.text_content(content).unwrap(), "Rock & Roll\u{a0}Hour");
        assert_eq!(
            doc.inner_markup(content).unwrap(),
            "<p>Rock &amp; Roll\u{a0}Hour</p>\
             <iframe id=\"programme-frame\" src=\"https://target.example.com/rock\"></iframe>"
        );
    }

    #[test]
    fn test_create_and_append_elements() {
        let doc = HeadlessDocument::new();
        let div = doc.create_element("DIV");
        let h3 = doc.create_element("h3");
        doc.set_text(h3, "Drive <Time>").unwrap();
        doc.append_child(div, h3).unwrap();

        assert!(!doc.is_attached(div));
        doc.append_child(doc.root(), div).unwrap();
        assert!(doc.is_attached(h3));

        assert_eq!(doc.tag_name(div).as_deref(), Some("div"));
        assert_eq!(doc.text_content(div).unwrap(), "Drive <Time>");
        assert_eq!(
            doc.inner_markup(div).unwrap(),
            "<h3>Drive &lt;Time&gt;</h3>"
        );
    }

    #[test]
    fn test_append_rejects_cycles() {
        let doc = HeadlessDocument::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        assert!(doc.append_child(inner, outer).is_err());
    }

    #[test]
    fn test_class_operations() {
        let doc = HeadlessDocument::from_markup(HOST).unwrap();
        let menu = doc.get_element_by_id(ids::MENU).unwrap();

        assert!(doc.toggle_class(menu, "active").unwrap());
        assert!(doc.has_class(menu, "active"));
        assert!(!doc.toggle_class(menu, "active").unwrap());
        assert!(!doc.has_class(menu, "active"));

        doc.add_class(menu, "open").unwrap();
        doc.add_class(menu, "open").unwrap();
        assert_eq!(doc.attribute(menu, "class").as_deref(), Some("open"));
        doc.remove_class(menu, "open").unwrap();
        assert_eq!(doc.attribute(menu, "class").as_deref(), Some(""));
    }

    #[test]
    fn test_listeners_bubble_to_ancestors() {
        let doc = HeadlessDocument::new();
        let card = doc.create_element("div");
        let img = doc.create_element("img");
        doc.append_child(card, img).unwrap();
        doc.append_child(doc.root(), card).unwrap();
        doc.add_listener(card, Listener::ProgrammeCard).unwrap();

        let path = doc.listeners_on_path(img);
        assert_eq!(path, vec![(card, Listener::ProgrammeCard)]);
    }

    #[test]
    fn test_media_support_and_playback() {
        let doc = HeadlessDocument::from_markup(r#"<audio id="radio-player"></audio><div id="box"></div>"#)
            .unwrap()
            .with_native_mime_types(["application/vnd.apple.mpegurl"]);
        let audio = doc.get_element_by_id(ids::RADIO_PLAYER).unwrap();
        let div = doc.get_element_by_id("box").unwrap();

        assert!(doc.can_play_type(audio, "application/vnd.apple.mpegurl"));
        assert!(!doc.can_play_type(audio, "audio/ogg"));
        assert!(!doc.can_play_type(div, "application/vnd.apple.mpegurl"));

        assert!(!doc.is_playing(audio));
        doc.play(audio).unwrap();
        assert!(doc.is_playing(audio));
    }

    #[test]
    fn test_open_in_new_context_is_recorded() {
        let doc = HeadlessDocument::new();
        doc.open_in_new_context("https://target.example.com/a");
        assert_eq!(doc.opened_urls(), vec!["https://target.example.com/a".to_string()]);
    }
}
