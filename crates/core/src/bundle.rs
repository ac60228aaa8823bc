//! The cache-ready representation of one fetched page.

use serde::{Deserialize, Serialize};

/// Everything the engine needs from a fetched page to splice it into the live
/// document. Never mutated after extraction; shared as `Rc<PageBundle>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBundle {
    /// Canonical absolute URL, the cache key.
    pub url: String,
    pub title: String,
    /// Inner markup of the main content container.
    pub content_html: String,
    pub inline_styles: Vec<InlineStyle>,
    pub stylesheets: Vec<StylesheetLink>,
    pub scripts: Vec<ScriptDescriptor>,
    /// Outer markup of top-level body elements outside the container.
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineStyle {
    pub text: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylesheetLink {
    /// The `href` exactly as written in the fetched page.
    pub href: Option<String>,
    /// `href` resolved against the fetched page's URL.
    pub absolute_href: Option<String>,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptDescriptor {
    pub src: Option<String>,
    pub absolute_src: Option<String>,
    #[serde(rename = "type")]
    pub script_type: Option<String>,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub defer: bool,
    /// Inline source; empty for external scripts.
    pub content: String,
}

impl ScriptDescriptor {
    pub fn is_external(&self) -> bool {
        self.src.is_some()
    }
}
