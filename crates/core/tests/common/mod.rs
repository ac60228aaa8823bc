//! Shared harness: an in-memory site served from fixtures and a script
//! runtime that records what it was asked to run.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use segue_core::fetch::{RawResponse, Transport};
use segue_core::{Engine, EngineConfig, Page, ScriptError, ScriptRuntime, TransportError};
use tokio::sync::oneshot;
use url::Url;

pub const ORIGIN: &str = "https://words.example";

pub type TestEngine = Engine<SiteTransport, RecordingRuntime>;

pub fn load_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path, e))
}

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// A page that only has a container, for bulk navigation.
pub fn generated_page(path: &str) -> String {
    format!(
        "<html><head><title>{path}</title></head>\
         <body><div class=\"container\"><p>{path}</p></div></body></html>"
    )
}

/// Serves fixtures by path. Paths under `/gen/` get a generated page,
/// anything else unknown is a 404.
pub struct SiteTransport {
    pages: RefCell<HashMap<String, (u16, String)>>,
    requests: RefCell<Vec<String>>,
    headers: RefCell<Vec<(String, String)>>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
}

impl SiteTransport {
    pub fn new() -> Self {
        let site = Self {
            pages: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
            headers: RefCell::new(Vec::new()),
            gates: RefCell::new(HashMap::new()),
        };
        site.serve("/index.html", 200, &load_fixture("index.html"));
        site.serve("/pages/shop.html", 200, &load_fixture("shop.html"));
        site.serve("/pages/user-center.html", 200, &load_fixture("user-center.html"));
        site.serve("/pages/maintenance.html", 200, &load_fixture("no-container.html"));
        site.serve("/pages/broken.html", 500, "<h1>Internal Server Error</h1>");
        site
    }

    pub fn serve(&self, path: &str, status: u16, body: &str) {
        self.pages
            .borrow_mut()
            .insert(path.to_string(), (status, body.to_string()));
    }

    /// Hold responses for `path` until the returned sender fires or drops.
    pub fn hold(&self, path: &str) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.gates.borrow_mut().insert(path.to_string(), gate);
        release
    }

    /// Requested paths, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.requests.borrow().iter().filter(|p| *p == path).count()
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        self.headers.borrow().clone()
    }
}

impl Transport for SiteTransport {
    async fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<RawResponse, TransportError> {
        self.requests.borrow_mut().push(url.path().to_string());
        self.headers
            .borrow_mut()
            .extend(headers.iter().map(|(n, v)| (n.to_string(), v.to_string())));

        let gate = self.gates.borrow_mut().remove(url.path());
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let page = self.pages.borrow().get(url.path()).cloned();
        let (status, body) = match page {
            Some(page) => page,
            None if url.path().starts_with("/gen/") => (200, generated_page(url.path())),
            None => (404, "not found".to_string()),
        };
        Ok(RawResponse {
            status,
            url: url.clone(),
            body,
        })
    }
}

/// Logs `load <url>`, `inline <source>` and `ready` entries in call order.
#[derive(Clone, Default)]
pub struct RecordingRuntime {
    log: Rc<RefCell<Vec<String>>>,
    failing: Rc<RefCell<HashSet<String>>>,
}

impl RecordingRuntime {
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// The shared log, so hooks and listeners can append to it too.
    pub fn log_handle(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.log)
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn fail_loading(&self, url: &str) {
        self.failing.borrow_mut().insert(url.to_string());
    }

    pub fn heal(&self, url: &str) {
        self.failing.borrow_mut().remove(url);
    }

    pub fn loads(&self, url: &str) -> usize {
        let entry = format!("load {url}");
        self.log.borrow().iter().filter(|e| **e == entry).count()
    }

    pub fn inline_runs(&self, source: &str) -> usize {
        let entry = format!("inline {source}");
        self.log.borrow().iter().filter(|e| **e == entry).count()
    }
}

impl ScriptRuntime for RecordingRuntime {
    async fn load_external(&self, url: &Url) -> Result<(), ScriptError> {
        tokio::task::yield_now().await;
        self.log.borrow_mut().push(format!("load {url}"));
        if self.failing.borrow().contains(url.as_str()) {
            return Err(ScriptError::Load {
                url: url.to_string(),
                reason: "404".to_string(),
            });
        }
        Ok(())
    }

    fn run_inline(&self, source: &str, _script_type: Option<&str>) -> Result<(), ScriptError> {
        self.log.borrow_mut().push(format!("inline {source}"));
        Ok(())
    }

    fn document_ready(&self) {
        self.log.borrow_mut().push("ready".to_string());
    }
}

pub fn home_page() -> Page {
    Page::from_html(&load_fixture("index.html"), url("/index.html"))
}

pub fn engine() -> TestEngine {
    engine_with(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> TestEngine {
    engine_with_runtime(config, RecordingRuntime::default())
}

pub fn engine_with_runtime(config: EngineConfig, runtime: RecordingRuntime) -> TestEngine {
    Engine::new(config, SiteTransport::new(), runtime, home_page()).unwrap()
}
