//! DOM mutations that splice a [`PageBundle`] into the live page.

use std::collections::HashSet;

use url::Url;

use crate::bundle::{InlineStyle, PageBundle, ScriptDescriptor, StylesheetLink};
use crate::dom::{self, DomNode, SelectorList};
use crate::error::NavigationError;
use crate::normalize::normalize_href;
use crate::page::Page;
use crate::progress::{BAR_CLASS, STYLE_MARKER};

pub const TRANSITIONING_CLASS: &str = "pjax-transitioning";
pub const LOADED_CLASS: &str = "pjax-loaded";

const INLINE_STYLE_ATTR: &str = "data-pjax-inline";
const TEMP_STYLE_ATTR: &str = "data-pjax-temp-style";
const EXTRA_ROOT_ATTR: &str = "data-pjax-extra-root";
pub(crate) const PRESERVE_ATTR: &str = "data-pjax-preserve";

/// Where the visible transition stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    Idle,
    /// Fading out and resolving the next page.
    Transitioning,
    /// New content is in the DOM.
    Applied,
    /// Scripts and hooks done.
    Settled,
    Errored,
}

/// Steps that only touch markup: styles, stylesheets, content, extras and
/// title. Fails without mutating anything when the container is gone.
pub fn apply_bundle(
    page: &mut Page,
    container: &SelectorList,
    bundle: &PageBundle,
) -> Result<(), NavigationError> {
    if page.container(container).is_none() {
        return Err(NavigationError::Apply(format!(
            "live document has no element matching `{}`",
            container.as_str()
        )));
    }
    apply_inline_styles(page, &bundle.inline_styles);
    sync_stylesheets(page, &bundle.stylesheets);
    swap_content(page, container, &bundle.content_html)?;
    apply_extras(page, container, &bundle.extras);
    page.set_title(&bundle.title);
    Ok(())
}

/// Drop the previous page's engine-managed `<style>` blocks and add the new
/// ones. The progress bar's style survives.
pub fn apply_inline_styles(page: &mut Page, styles: &[InlineStyle]) {
    page.document_mut().remove_where(&|n| {
        n.is_tag("style") && n.has_attr(INLINE_STYLE_ATTR) && !n.has_attr(STYLE_MARKER)
    });
    let Some(head) = page.head_mut() else {
        return;
    };
    for style in styles {
        let mut node = DomNode::new_element("style");
        for (name, value) in &style.attributes {
            if name != INLINE_STYLE_ATTR {
                node.set_attr(name, value);
            }
        }
        node.set_attr(INLINE_STYLE_ATTR, "true");
        node.children.push(DomNode::new_text(&style.text));
        head.children.push(node);
    }
}

/// Mark the shell's own head styles as engine-managed so the first swap
/// replaces them.
pub fn adopt_head_styles(page: &mut Page) {
    let Some(head) = page.head_mut() else {
        return;
    };
    for style in head.children.iter_mut() {
        if style.is_tag("style") && !style.has_attr(STYLE_MARKER) {
            style.set_attr(INLINE_STYLE_ATTR, "true");
        }
    }
}

/// Make the page's stylesheet links cover `sheets`. Links the engine added
/// earlier are removed once no longer wanted; the shell's own links are
/// never touched.
pub fn sync_stylesheets(page: &mut Page, sheets: &[StylesheetLink]) {
    let location = page.location().clone();
    let wanted: HashSet<&str> = sheets
        .iter()
        .flat_map(|s| [s.href.as_deref(), s.absolute_href.as_deref()])
        .flatten()
        .collect();
    page.document_mut().remove_where(&|n| {
        if !(n.is_tag("link") && n.get_attr(TEMP_STYLE_ATTR) == Some("true")) {
            return false;
        }
        let href = n.get_attr("href");
        let absolute = normalize_href(href, &location);
        let still_wanted = href.is_some_and(|h| wanted.contains(h))
            || absolute.as_deref().is_some_and(|h| wanted.contains(h));
        !still_wanted
    });

    for sheet in sheets {
        if sheet.href.is_none() && sheet.absolute_href.is_none() {
            continue;
        }
        if has_stylesheet(page.document(), sheet, &location) {
            continue;
        }
        let mut link = DomNode::new_element("link");
        if sheet.attributes.is_empty() {
            link.set_attr("rel", "stylesheet");
            if let Some(href) = sheet.href.as_deref().or(sheet.absolute_href.as_deref()) {
                link.set_attr("href", href);
            }
        } else {
            for (name, value) in &sheet.attributes {
                if name != TEMP_STYLE_ATTR {
                    link.set_attr(name, value);
                }
            }
        }
        link.set_attr(TEMP_STYLE_ATTR, "true");
        if let Some(head) = page.head_mut() {
            head.children.push(link);
        }
    }
}

fn has_stylesheet(document: &DomNode, sheet: &StylesheetLink, location: &Url) -> bool {
    let links = document.find_all(&|n| n.is_tag("link") && n.has_rel("stylesheet"));
    if let Some(href) = sheet.href.as_deref() {
        if links.iter().any(|l| l.get_attr("href") == Some(href)) {
            return true;
        }
    }
    let Some(absolute) = sheet.absolute_href.as_deref() else {
        return false;
    };
    links
        .iter()
        .any(|l| normalize_href(l.get_attr("href"), location).as_deref() == Some(absolute))
}

/// Replace the container's children with `html`.
pub fn swap_content(
    page: &mut Page,
    container: &SelectorList,
    html: &str,
) -> Result<(), NavigationError> {
    let node = page.container_mut(container).ok_or_else(|| {
        NavigationError::Apply(format!("container `{}` disappeared", container.as_str()))
    })?;
    node.children = dom::parse_fragment(html);
    Ok(())
}

fn is_extra_root(node: &DomNode) -> bool {
    node.is_element() && node.has_attr(EXTRA_ROOT_ATTR)
}

/// Find or create the mount point for extras. On creation every top-level
/// body element that is not the container (or its wrapper), a script, the
/// progress bar or marked `data-pjax-preserve` moves into it.
pub fn ensure_extra_root(page: &mut Page, container: &SelectorList) -> bool {
    if page.document().find(&is_extra_root).is_some() {
        return true;
    }
    let Some(body_path) = page.body_path() else {
        return false;
    };
    let container_top = page.document().select_path(container).and_then(|path| {
        path.strip_prefix(body_path.as_slice())
            .and_then(|rest| rest.first().copied())
    });
    let Some(body) = page.document_mut().node_at_mut(&body_path) else {
        return false;
    };

    let mut root = DomNode::new_element("div").with_attr(EXTRA_ROOT_ATTR, "true");
    let mut kept = Vec::with_capacity(body.children.len() + 1);
    for (idx, child) in std::mem::take(&mut body.children).into_iter().enumerate() {
        let movable = child.is_element()
            && Some(idx) != container_top
            && !child.is_tag("script")
            && !child.has_class(BAR_CLASS)
            && !child.has_attr(PRESERVE_ATTR);
        if movable {
            root.children.push(child);
        } else {
            kept.push(child);
        }
    }
    kept.push(root);
    body.children = kept;
    true
}

pub fn apply_extras(page: &mut Page, container: &SelectorList, extras: &[String]) {
    if !ensure_extra_root(page, container) {
        return;
    }
    if let Some(root) = page.document_mut().find_mut(&is_extra_root) {
        root.children = dom::parse_fragment(&extras.concat());
    }
}

pub fn add_container_class(page: &mut Page, container: &SelectorList, class: &str) {
    if let Some(node) = page.container_mut(container) {
        node.add_class(class);
    }
}

pub fn remove_container_class(page: &mut Page, container: &SelectorList, class: &str) {
    if let Some(node) = page.container_mut(container) {
        node.remove_class(class);
    }
}

/// Append the `<script>` element for an external script about to load.
pub fn append_script_element(page: &mut Page, src: &str, script: &ScriptDescriptor) {
    let Some(body) = page.body_mut() else {
        return;
    };
    let mut node = DomNode::new_element("script").with_attr("src", src);
    if let Some(script_type) = &script.script_type {
        node.set_attr("type", script_type);
    }
    if script.defer {
        node.set_attr("defer", "");
    }
    if script.is_async {
        node.set_attr("async", "");
    }
    body.children.push(node);
}

/// Take back the element of a script that failed to load.
pub fn remove_script_element(page: &mut Page, src: &str) {
    if let Some(body) = page.body_mut() {
        body.children
            .retain(|n| !(n.is_tag("script") && n.get_attr("src") == Some(src)));
    }
}
