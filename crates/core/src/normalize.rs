//! Resolution of possibly-relative hrefs into canonical absolute URLs.

use url::Url;

/// Resolve `href` against `base`. `None` when the href is absent, blank, or
/// cannot be resolved.
pub fn normalize_url(href: Option<&str>, base: &Url) -> Option<Url> {
    let href = href?.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}

/// Same as [`normalize_url`] but yields the serialized form used as a cache
/// and registry key.
pub fn normalize_href(href: Option<&str>, base: &Url) -> Option<String> {
    normalize_url(href, base).map(String::from)
}

/// Scheme, host and port all equal.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
