//! Decides which link clicks the engine takes over.

use url::Url;

use crate::dom::DomNode;
use crate::normalize::{normalize_url, same_origin};

const UNSAFE_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub meta: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.meta || self.ctrl || self.shift || self.alt
    }
}

/// The parts of an `<a>` element the click filter looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anchor {
    pub href: Option<String>,
    pub target: Option<String>,
    pub download: bool,
    pub no_pjax: bool,
}

impl Anchor {
    pub fn new(href: &str) -> Self {
        Self {
            href: Some(href.to_string()),
            ..Self::default()
        }
    }

    /// `None` unless `node` is an `<a>` element.
    pub fn from_node(node: &DomNode) -> Option<Self> {
        if !node.is_tag("a") {
            return None;
        }
        Some(Self {
            href: node.get_attr("href").map(String::from),
            target: node.get_attr("target").map(String::from),
            download: node.has_attr("download"),
            no_pjax: node.has_attr("data-no-pjax"),
        })
    }
}

/// A click that reached the document, resolved to its nearest anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickEvent {
    /// 0 is the primary button.
    pub button: u16,
    pub modifiers: Modifiers,
    pub anchor: Option<Anchor>,
}

impl ClickEvent {
    /// A plain primary-button click on a link.
    pub fn on_link(anchor: Anchor) -> Self {
        Self {
            button: 0,
            modifiers: Modifiers::default(),
            anchor: Some(anchor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickDecision {
    /// Let the browser handle it.
    Ignore,
    /// Suppress the default but do nothing: the link points at the current page.
    PreventOnly,
    Navigate(Url),
}

pub fn decide(event: &ClickEvent, location: &Url) -> ClickDecision {
    if event.button != 0 || event.modifiers.any() {
        return ClickDecision::Ignore;
    }
    let Some(anchor) = &event.anchor else {
        return ClickDecision::Ignore;
    };
    if anchor.download || anchor.no_pjax {
        return ClickDecision::Ignore;
    }
    if anchor
        .target
        .as_deref()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case("_blank"))
    {
        return ClickDecision::Ignore;
    }
    let Some(href) = anchor.href.as_deref().map(str::trim) else {
        return ClickDecision::Ignore;
    };
    if href.is_empty() || href == "#" || has_unsafe_scheme(href) {
        return ClickDecision::Ignore;
    }
    let Some(mut url) = normalize_url(Some(href), location) else {
        return ClickDecision::Ignore;
    };
    if !same_origin(&url, location) || url.fragment().is_some_and(|f| !f.is_empty()) {
        return ClickDecision::Ignore;
    }
    // A bare trailing `#` names no anchor.
    url.set_fragment(None);
    if url == *location {
        ClickDecision::PreventOnly
    } else {
        ClickDecision::Navigate(url)
    }
}

fn has_unsafe_scheme(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    UNSAFE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}
