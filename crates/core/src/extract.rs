//! Turns a fetched HTML document into a [`PageBundle`].

use url::Url;

use crate::applier::PRESERVE_ATTR;
use crate::bundle::{InlineStyle, PageBundle, ScriptDescriptor, StylesheetLink};
use crate::dom::{self, DomNode, SelectorList};
use crate::error::NavigationError;
use crate::normalize::normalize_href;

/// Parse `html` fetched from `url` and pull out the parts the engine splices
/// into the live page.
pub fn extract_bundle(
    html: &str,
    url: &Url,
    container: &SelectorList,
) -> Result<PageBundle, NavigationError> {
    let document = dom::parse_html(html);

    let container_path =
        document
            .select_path(container)
            .ok_or_else(|| NavigationError::MalformedResponse {
                url: url.to_string(),
                selector: container.as_str().to_string(),
            })?;
    let content_html = document
        .node_at(&container_path)
        .map(DomNode::inner_html)
        .unwrap_or_default();

    let title = document
        .find(&|n| n.is_tag("title"))
        .map(DomNode::text_content)
        .unwrap_or_default();

    let head = document.find(&|n| n.is_tag("head"));
    let inline_styles = head
        .map(collect_inline_styles)
        .unwrap_or_default();
    let stylesheets = head
        .map(|head| collect_stylesheets(head, url))
        .unwrap_or_default();

    let (scripts, extras) = match body_path(&document) {
        Some(body_path) => {
            let body = document.node_at(&body_path);
            let scripts = body
                .map(|body| collect_scripts(body, url))
                .unwrap_or_default();
            let extras = body
                .map(|body| collect_extras(body, &body_path, &container_path))
                .unwrap_or_default();
            (scripts, extras)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(PageBundle {
        url: url.to_string(),
        title,
        content_html,
        inline_styles,
        stylesheets,
        scripts,
        extras,
    })
}

fn collect_inline_styles(head: &DomNode) -> Vec<InlineStyle> {
    head.find_all(&|n| n.is_tag("style"))
        .into_iter()
        .map(|style| InlineStyle {
            text: style.raw_text(),
            attributes: style.attributes.clone(),
        })
        .collect()
}

fn collect_stylesheets(head: &DomNode, base: &Url) -> Vec<StylesheetLink> {
    head.find_all(&|n| n.is_tag("link") && n.has_rel("stylesheet"))
        .into_iter()
        .map(|link| {
            let href = link.get_attr("href").map(String::from);
            StylesheetLink {
                absolute_href: normalize_href(href.as_deref(), base),
                href,
                attributes: link.attributes.clone(),
            }
        })
        .collect()
}

fn collect_scripts(body: &DomNode, base: &Url) -> Vec<ScriptDescriptor> {
    body.find_all(&|n| n.is_tag("script"))
        .into_iter()
        .map(|script| {
            let src = script.get_attr("src").map(String::from);
            let content = if src.is_some() {
                String::new()
            } else {
                script.raw_text()
            };
            ScriptDescriptor {
                absolute_src: normalize_href(src.as_deref(), base),
                src,
                script_type: script.get_attr("type").map(String::from),
                is_async: script.has_attr("async"),
                defer: script.has_attr("defer"),
                content,
            }
        })
        .collect()
}

/// Top-level body elements other than scripts, preserved shell elements and
/// the container (or a wrapper holding it).
fn collect_extras(body: &DomNode, body_path: &[usize], container_path: &[usize]) -> Vec<String> {
    let container_rel = container_path.strip_prefix(body_path);
    body.children
        .iter()
        .enumerate()
        .filter(|(_, child)| {
            child.is_element() && !child.is_tag("script") && !child.has_attr(PRESERVE_ATTR)
        })
        .filter(|(idx, _)| container_rel.and_then(|rel| rel.first()) != Some(idx))
        .map(|(_, child)| child.outer_html())
        .collect()
}

pub(crate) fn body_path(document: &DomNode) -> Option<Vec<usize>> {
    let html_idx = document.children.iter().position(|c| c.is_tag("html"))?;
    let html = document.children.get(html_idx)?;
    let body_idx = html.children.iter().position(|c| c.is_tag("body"))?;
    Some(vec![html_idx, body_idx])
}
