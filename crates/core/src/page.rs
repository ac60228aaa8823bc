//! The live page: document tree plus the window state a browser would keep
//! next to it.

use url::Url;

use crate::dom::{self, DomNode, SelectorList};
use crate::error::ConfigError;
use crate::extract::body_path;
use crate::history::SessionHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPosition {
    pub y: u32,
    pub behavior: ScrollBehavior,
}

/// A headless document and window.
#[derive(Debug, Clone)]
pub struct Page {
    document: DomNode,
    location: Url,
    history: SessionHistory,
    scroll: ScrollPosition,
    pending_load: Option<Url>,
}

impl Page {
    pub fn from_html(html: &str, location: Url) -> Self {
        Self {
            document: dom::parse_html(html),
            history: SessionHistory::new(location.clone()),
            location,
            scroll: ScrollPosition {
                y: 0,
                behavior: ScrollBehavior::Instant,
            },
            pending_load: None,
        }
    }

    /// Like [`Page::from_html`] with the location given as a string.
    pub fn parse(html: &str, location: &str) -> Result<Self, ConfigError> {
        let location =
            Url::parse(location).map_err(|_| ConfigError::DocumentUrl(location.to_string()))?;
        Ok(Self::from_html(html, location))
    }

    pub fn document(&self) -> &DomNode {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut DomNode {
        &mut self.document
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub(crate) fn set_location(&mut self, url: Url) {
        self.location = url;
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut SessionHistory {
        &mut self.history
    }

    pub fn scroll(&self) -> ScrollPosition {
        self.scroll
    }

    pub fn scroll_to(&mut self, y: u32, behavior: ScrollBehavior) {
        self.scroll = ScrollPosition { y, behavior };
    }

    pub fn title(&self) -> String {
        self.document
            .find(&|n| n.is_tag("title"))
            .map(DomNode::text_content)
            .unwrap_or_default()
    }

    /// Set the `<title>`, creating it in the head when the page has none.
    pub fn set_title(&mut self, title: &str) {
        if let Some(node) = self.document.find_mut(&|n| n.is_tag("title")) {
            node.set_text(title);
            return;
        }
        if let Some(head) = self.head_mut() {
            head.children
                .push(DomNode::new_element("title").with_child(DomNode::new_text(title)));
        }
    }

    pub fn head(&self) -> Option<&DomNode> {
        self.document.find(&|n| n.is_tag("head"))
    }

    pub fn head_mut(&mut self) -> Option<&mut DomNode> {
        self.document.find_mut(&|n| n.is_tag("head"))
    }

    pub fn body(&self) -> Option<&DomNode> {
        self.document.node_at(&self.body_path()?)
    }

    pub fn body_mut(&mut self) -> Option<&mut DomNode> {
        let path = self.body_path()?;
        self.document.node_at_mut(&path)
    }

    pub(crate) fn body_path(&self) -> Option<Vec<usize>> {
        body_path(&self.document)
    }

    pub fn container(&self, selector: &SelectorList) -> Option<&DomNode> {
        self.document.select_first(selector)
    }

    pub fn container_mut(&mut self, selector: &SelectorList) -> Option<&mut DomNode> {
        let path = self.document.select_path(selector)?;
        self.document.node_at_mut(&path)
    }

    /// Leave the page the ordinary way: the location changes and the new
    /// document is left for the host to load. Assigning the current location
    /// replaces its entry instead of pushing a new one.
    pub fn assign(&mut self, url: Url) {
        if url == self.location {
            self.history.replace_state(None, "", url.clone());
        } else {
            self.history.push_state(None, "", url.clone());
        }
        self.location = url.clone();
        self.pending_load = Some(url);
    }

    /// The full load requested by [`Page::assign`], if any.
    pub fn pending_load(&self) -> Option<&Url> {
        self.pending_load.as_ref()
    }

    pub fn take_pending_load(&mut self) -> Option<Url> {
        self.pending_load.take()
    }

    /// Replace the whole document after a full load, keeping history.
    pub fn load_document(&mut self, html: &str, location: Url) {
        self.document = dom::parse_html(html);
        self.location = location;
        self.pending_load = None;
        self.scroll = ScrollPosition {
            y: 0,
            behavior: ScrollBehavior::Instant,
        };
    }
}
