//! Reinitialization hooks run after a swap, and listeners for the
//! completion event.

use tracing::trace;
use url::Url;

use crate::page::Page;

pub const INITIALIZE_STORAGE: &str = "initializeStorage";
pub const INITIALIZE_THEME: &str = "initializeTheme";
pub const INIT_THEME_TOGGLE_BUTTON: &str = "initThemeToggleButton";
pub const INIT_MOBILE_NAV_BAR: &str = "initMobileNavBar";
pub const INIT_USER_CENTER_PAGE: &str = "initUserCenterPage";
pub const INIT_SHOP_PAGE: &str = "initShopPage";

/// What a hook is told about the page it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    pub url: Url,
    /// Last path segment without `.html`; `index` for a directory URL.
    pub page_name: String,
}

impl HookContext {
    pub fn new(url: &Url) -> Self {
        Self {
            page_name: page_name(url),
            url: url.clone(),
        }
    }
}

pub fn page_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let name = segment.strip_suffix(".html").unwrap_or(segment);
    if name.is_empty() {
        "index".to_string()
    } else {
        name.to_string()
    }
}

pub type Hook = Box<dyn Fn(&mut Page, &HookContext)>;

/// Named callbacks, run in registration order. Registering a name twice
/// replaces the earlier callback in place.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<(String, Hook)>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, hook: Hook) {
        let name = name.into();
        match self.hooks.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = hook,
            None => self.hooks.push((name, hook)),
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(n, _)| n != name);
        self.hooks.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn run_all(&self, page: &mut Page, ctx: &HookContext) {
        for (name, hook) in &self.hooks {
            trace!(hook = %name, page = %ctx.page_name, "running hook");
            hook(page, ctx);
        }
    }
}

/// Emitted once a navigation has fully settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigated {
    pub url: Url,
}

pub type Listener = Box<dyn Fn(&Navigated)>;

#[derive(Default)]
pub struct Listeners {
    listeners: Vec<Listener>,
}

impl Listeners {
    pub fn add(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &Navigated) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}
