//! Owned HTML tree used both for parsing fetched pages and as the live document.

pub mod selector;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

pub use selector::SelectorList;

/// Elements whose text children are emitted without escaping.
const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

/// Elements that never have a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// A node in our DOM tree. Attributes keep their source order so they can be
/// re-attached verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct DomNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<DomNode>,
    pub node_type: NodeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Comment,
    Document,
}

impl DomNode {
    pub fn new_element(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            node_type: NodeType::Element,
        }
    }

    pub fn new_text(text: &str) -> Self {
        Self {
            tag: String::new(),
            attributes: Vec::new(),
            text: text.to_string(),
            children: Vec::new(),
            node_type: NodeType::Text,
        }
    }

    pub fn new_comment(text: &str) -> Self {
        Self {
            node_type: NodeType::Comment,
            ..Self::new_text(text)
        }
    }

    pub fn new_document() -> Self {
        Self {
            tag: String::new(),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            node_type: NodeType::Document,
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.is_element() && self.tag == tag
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attributes.retain(|(n, _)| n != name);
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get_attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let mut classes: Vec<String> = self.classes().map(String::from).collect();
        classes.push(class.to_string());
        self.set_attr("class", &classes.join(" "));
    }

    pub fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let classes: Vec<String> = self
            .classes()
            .filter(|c| *c != class)
            .map(String::from)
            .collect();
        self.set_attr("class", &classes.join(" "));
    }

    /// Whether the `rel` attribute's token list contains `token`.
    pub fn has_rel(&self, token: &str) -> bool {
        self.get_attr("rel")
            .map(|rel| rel.split_whitespace().any(|t| t.eq_ignore_ascii_case(token)))
            .unwrap_or(false)
    }

    /// Element children only, skipping text and comments.
    pub fn element_children(&self) -> impl Iterator<Item = &DomNode> {
        self.children.iter().filter(|c| c.is_element())
    }

    /// Get the visible text content of this node and all children.
    pub fn text_content(&self) -> String {
        let mut result = String::new();
        self.collect_text(&mut result);
        result.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        match self.node_type {
            NodeType::Text => {
                for word in self.text.split_whitespace() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(word);
                }
            }
            NodeType::Comment => {}
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Concatenated descendant text, untouched. This is what `textContent`
    /// yields for `<style>` and `<script>`.
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        self.collect_raw_text(&mut out);
        out
    }

    fn collect_raw_text(&self, out: &mut String) {
        match self.node_type {
            NodeType::Text => out.push_str(&self.text),
            NodeType::Comment => {}
            _ => {
                for child in &self.children {
                    child.collect_raw_text(out);
                }
            }
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children = vec![DomNode::new_text(text)];
    }

    /// First node in document order (self included) matching `pred`.
    pub fn find(&self, pred: &dyn Fn(&DomNode) -> bool) -> Option<&DomNode> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(pred))
    }

    pub fn find_mut(&mut self, pred: &dyn Fn(&DomNode) -> bool) -> Option<&mut DomNode> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(pred))
    }

    /// Every node in document order (self included) matching `pred`.
    pub fn find_all(&self, pred: &dyn Fn(&DomNode) -> bool) -> Vec<&DomNode> {
        let mut out = Vec::new();
        self.collect_matching(pred, &mut out);
        out
    }

    fn collect_matching<'a>(&'a self, pred: &dyn Fn(&DomNode) -> bool, out: &mut Vec<&'a DomNode>) {
        if pred(self) {
            out.push(self);
        }
        for child in &self.children {
            child.collect_matching(pred, out);
        }
    }

    /// Remove every descendant matching `pred`, at any depth.
    pub fn remove_where(&mut self, pred: &dyn Fn(&DomNode) -> bool) {
        self.children.retain(|c| !pred(c));
        for child in &mut self.children {
            child.remove_where(pred);
        }
    }

    /// First element in document order matching `selector`.
    pub fn select_first(&self, selector: &SelectorList) -> Option<&DomNode> {
        let path = self.select_path(selector)?;
        self.node_at(&path)
    }

    /// Every element in document order matching `selector`.
    pub fn select_all(&self, selector: &SelectorList) -> Vec<&DomNode> {
        let mut out = Vec::new();
        let mut ancestors = Vec::new();
        self.collect_selected(selector, &mut ancestors, &mut out);
        out
    }

    fn collect_selected<'a>(
        &'a self,
        selector: &SelectorList,
        ancestors: &mut Vec<&'a DomNode>,
        out: &mut Vec<&'a DomNode>,
    ) {
        if self.is_element() && selector.matches(self, ancestors) {
            out.push(self);
        }
        ancestors.push(self);
        for child in &self.children {
            child.collect_selected(selector, ancestors, out);
        }
        ancestors.pop();
    }

    /// Child-index path from `self` to the first element matching `selector`.
    pub fn select_path(&self, selector: &SelectorList) -> Option<Vec<usize>> {
        let mut ancestors = Vec::new();
        let mut path = Vec::new();
        if self.search_path(selector, &mut ancestors, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn search_path<'a>(
        &'a self,
        selector: &SelectorList,
        ancestors: &mut Vec<&'a DomNode>,
        path: &mut Vec<usize>,
    ) -> bool {
        if self.is_element() && selector.matches(self, ancestors) {
            return true;
        }
        ancestors.push(self);
        for (idx, child) in self.children.iter().enumerate() {
            path.push(idx);
            if child.search_path(selector, ancestors, path) {
                ancestors.pop();
                return true;
            }
            path.pop();
        }
        ancestors.pop();
        false
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&DomNode> {
        match path.split_first() {
            None => Some(self),
            Some((idx, rest)) => self.children.get(*idx)?.node_at(rest),
        }
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut DomNode> {
        match path.split_first() {
            None => Some(self),
            Some((idx, rest)) => self.children.get_mut(*idx)?.node_at_mut(rest),
        }
    }

    /// Serialized markup of this node's children.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        let raw = RAW_TEXT_TAGS.contains(&self.tag.as_str());
        for child in &self.children {
            child.write_html(&mut out, raw);
        }
        out
    }

    /// Serialized markup of this node including its own tag.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out, false);
        out
    }

    fn write_html(&self, out: &mut String, raw_parent: bool) {
        match self.node_type {
            NodeType::Text => {
                if raw_parent {
                    out.push_str(&self.text);
                } else {
                    out.push_str(&html_escape::encode_text(&self.text));
                }
            }
            NodeType::Comment => {
                out.push_str("<!--");
                out.push_str(&self.text);
                out.push_str("-->");
            }
            NodeType::Document => {
                for child in &self.children {
                    child.write_html(out, false);
                }
            }
            NodeType::Element => {
                out.push('<');
                out.push_str(&self.tag);
                for (name, value) in &self.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&self.tag.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html());
                out.push_str("</");
                out.push_str(&self.tag);
                out.push('>');
            }
        }
    }
}

/// Parse an HTML string into a DomNode tree rooted at a Document node.
pub fn parse_html(html: &str) -> DomNode {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };

    // Reading from an in-memory slice cannot fail.
    let dom = parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .unwrap_or_default();

    convert_node(&dom.document)
}

/// Parse markup meant for an element's inner HTML in body context.
pub fn parse_fragment(html: &str) -> Vec<DomNode> {
    let wrapped = format!("<!DOCTYPE html><html><head></head><body>{html}</body></html>");
    let mut document = parse_html(&wrapped);
    match document.find_mut(&|n| n.is_tag("body")) {
        Some(body) => std::mem::take(&mut body.children),
        None => Vec::new(),
    }
}

fn convert_node(handle: &Handle) -> DomNode {
    match &handle.data {
        NodeData::Document => {
            let mut doc = DomNode::new_document();
            for child in handle.children.borrow().iter() {
                if let Some(node) = convert_child(child) {
                    doc.children.push(node);
                }
            }
            doc
        }
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let mut node = DomNode::new_element(&name.local);
            for attr in attrs.borrow().iter() {
                node.attributes
                    .push((attr.name.local.to_string(), attr.value.to_string()));
            }
            // <template> keeps its markup in a separate fragment.
            let source = template_contents.borrow().clone().unwrap_or_else(|| handle.clone());
            for child in source.children.borrow().iter() {
                if let Some(child_node) = convert_child(child) {
                    node.children.push(child_node);
                }
            }
            node
        }
        NodeData::Text { contents } => DomNode::new_text(&contents.borrow()),
        NodeData::Comment { contents } => DomNode::new_comment(contents),
        _ => DomNode::new_document(),
    }
}

fn convert_child(handle: &Handle) -> Option<DomNode> {
    match &handle.data {
        NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => None,
        _ => Some(convert_node(handle)),
    }
}
