//! Script replay support: the runtime seam, the loaded-script registry and
//! the executable-type allow-list.

use std::collections::HashSet;
use std::future::Future;
use std::rc::Rc;

use url::Url;

use crate::dom::DomNode;
use crate::error::ScriptError;
use crate::normalize::normalize_href;

/// `type` values that mark a script as executable JavaScript.
const EXECUTABLE_TYPES: &[&str] = &[
    "text/javascript",
    "application/javascript",
    "application/x-javascript",
    "module",
];

/// Whether an inline script with this `type` attribute should run. Absent or
/// blank counts as JavaScript; comparison is case-insensitive.
pub fn should_execute_type(script_type: Option<&str>) -> bool {
    let Some(script_type) = script_type else {
        return true;
    };
    let normalized = script_type.trim().to_ascii_lowercase();
    normalized.is_empty() || EXECUTABLE_TYPES.contains(&normalized.as_str())
}

/// Executes page scripts on behalf of the engine.
pub trait ScriptRuntime {
    /// Load and run an external script. Resolves once it has run or failed.
    fn load_external(&self, url: &Url) -> impl Future<Output = Result<(), ScriptError>>;

    /// Run inline source synchronously.
    fn run_inline(&self, source: &str, script_type: Option<&str>) -> Result<(), ScriptError>;

    /// The new content is in place and every hook has run.
    fn document_ready(&self) {}
}

impl<R: ScriptRuntime + ?Sized> ScriptRuntime for Rc<R> {
    fn load_external(&self, url: &Url) -> impl Future<Output = Result<(), ScriptError>> {
        (**self).load_external(url)
    }

    fn run_inline(&self, source: &str, script_type: Option<&str>) -> Result<(), ScriptError> {
        (**self).run_inline(source, script_type)
    }

    fn document_ready(&self) {
        (**self).document_ready()
    }
}

/// A runtime that accepts every script and does nothing with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRuntime;

impl ScriptRuntime for NoopRuntime {
    async fn load_external(&self, _url: &Url) -> Result<(), ScriptError> {
        Ok(())
    }

    fn run_inline(&self, _source: &str, _script_type: Option<&str>) -> Result<(), ScriptError> {
        Ok(())
    }
}

/// Absolute URLs of external scripts that have run at least once in this
/// document. Only ever grows.
#[derive(Debug, Default, Clone)]
pub struct LoadedScripts {
    urls: HashSet<String>,
}

impl LoadedScripts {
    /// Seed from every `script[src]` already in `document`.
    pub fn seed(document: &DomNode, base: &Url) -> Self {
        let urls = document
            .find_all(&|n| n.is_tag("script") && n.has_attr("src"))
            .into_iter()
            .filter_map(|script| normalize_href(script.get_attr("src"), base))
            .collect();
        Self { urls }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns false when the URL was already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
