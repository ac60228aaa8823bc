//! The navigation engine: ties the fetcher, cache, applier, history and
//! progress bar together around one live [`Page`].

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use futures::join;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::applier::{self, ApplyPhase, LOADED_CLASS, TRANSITIONING_CLASS};
use crate::bundle::{PageBundle, ScriptDescriptor};
use crate::cache::NavigationCache;
use crate::config::EngineConfig;
use crate::dom::SelectorList;
use crate::error::{ConfigError, NavigationError};
use crate::extract::extract_bundle;
use crate::fetch::{Fetcher, Transport};
use crate::history::{self, PopStateEvent};
use crate::hooks::{HookContext, HookRegistry, Listeners, Navigated};
use crate::interceptor::{self, ClickDecision, ClickEvent};
use crate::normalize::normalize_url;
use crate::page::{Page, ScrollBehavior};
use crate::progress::{ProgressIndicator, ProgressState};
use crate::scripts::{should_execute_type, LoadedScripts, ScriptRuntime};

/// How a navigation request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The page was swapped in place.
    Applied(Url),
    /// A newer navigation took over.
    Cancelled,
    /// The engine left the event to the browser.
    Ignored,
    /// Default suppressed, nothing else to do (link to the current page).
    Prevented,
    /// Handed over to an ordinary page load. `error` is `None` when the
    /// engine is switched off.
    FullReload {
        url: Url,
        error: Option<NavigationError>,
    },
    /// Nothing was attempted.
    Rejected(NavigationError),
}

pub struct Engine<T: Transport, R: ScriptRuntime> {
    config: EngineConfig,
    container: SelectorList,
    fetcher: Fetcher<T>,
    runtime: R,
    page: RefCell<Page>,
    cache: RefCell<NavigationCache>,
    scripts: RefCell<LoadedScripts>,
    progress: RefCell<ProgressIndicator>,
    hooks: RefCell<HookRegistry>,
    listeners: RefCell<Listeners>,
    phase: Cell<ApplyPhase>,
    generation: Cell<u64>,
    listening: Cell<bool>,
}

impl<T: Transport, R: ScriptRuntime> Engine<T, R> {
    /// Take over `page`. With the kill switch off the page is left exactly
    /// as given and every navigation becomes a full load.
    pub fn new(
        config: EngineConfig,
        transport: T,
        runtime: R,
        mut page: Page,
    ) -> Result<Self, ConfigError> {
        let container = config.container()?;
        let progress = ProgressIndicator::new(config.enable_progress_bar);
        let scripts = LoadedScripts::seed(page.document(), page.location());

        if config.enabled {
            progress.install(page.document_mut());
            applier::ensure_extra_root(&mut page, &container);
            applier::adopt_head_styles(&mut page);
            let location = page.location().clone();
            let title = page.title();
            history::replace(page.history_mut(), &location, &title);
            info!(url = %location, container = %container.as_str(), "navigation engine ready");
        } else {
            warn!("navigation engine disabled by configuration, using full page loads");
        }

        Ok(Self {
            fetcher: Fetcher::new(transport, config.request_header.clone()),
            cache: RefCell::new(NavigationCache::new(config.cache_size)),
            listening: Cell::new(config.enabled),
            config,
            container,
            runtime,
            page: RefCell::new(page),
            scripts: RefCell::new(scripts),
            progress: RefCell::new(progress),
            hooks: RefCell::new(HookRegistry::new()),
            listeners: RefCell::new(Listeners::default()),
            phase: Cell::new(ApplyPhase::Idle),
            generation: Cell::new(0),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn page(&self) -> Ref<'_, Page> {
        self.page.borrow()
    }

    /// Consume the engine and hand back the page.
    pub fn into_page(self) -> Page {
        self.page.into_inner()
    }

    pub fn phase(&self) -> ApplyPhase {
        self.phase.get()
    }

    pub fn progress_state(&self) -> ProgressState {
        self.progress.borrow().state()
    }

    /// Progress states visited by the latest navigation.
    pub fn progress_trail(&self) -> Vec<ProgressState> {
        self.progress.borrow().trail().to_vec()
    }

    pub fn transport(&self) -> &T {
        self.fetcher.transport()
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_cached(&self, url: &str) -> bool {
        self.cache.borrow().contains(url)
    }

    /// Cached URLs, oldest first.
    pub fn cached_urls(&self) -> Vec<String> {
        self.cache.borrow().urls().map(String::from).collect()
    }

    pub fn is_script_loaded(&self, url: &str) -> bool {
        self.scripts.borrow().contains(url)
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Stop intercepting clicks and history events. Programmatic navigation
    /// keeps working.
    pub fn disable(&self) {
        self.listening.set(false);
        debug!("stopped intercepting clicks and history events");
    }

    pub fn is_listening(&self) -> bool {
        self.listening.get()
    }

    pub fn register_hook(
        &self,
        name: impl Into<String>,
        hook: impl Fn(&mut Page, &HookContext) + 'static,
    ) {
        self.hooks.borrow_mut().register(name, Box::new(hook));
    }

    pub fn on_navigated(&self, listener: impl Fn(&Navigated) + 'static) {
        self.listeners.borrow_mut().add(Box::new(listener));
    }

    /// Navigate to `href`, resolved against the current location, pushing a
    /// history entry on success.
    pub async fn navigate_to(&self, href: &str) -> NavigationOutcome {
        let location = self.page.borrow().location().clone();
        let Some(url) = normalize_url(Some(href), &location) else {
            warn!(href, "cannot resolve navigation target");
            return NavigationOutcome::Rejected(NavigationError::InvalidUrl(href.to_string()));
        };
        if !self.config.enabled {
            self.page.borrow_mut().assign(url.clone());
            return NavigationOutcome::FullReload { url, error: None };
        }
        self.navigate(url, true).await
    }

    pub async fn click(&self, event: &ClickEvent) -> NavigationOutcome {
        if !self.listening.get() {
            return NavigationOutcome::Ignored;
        }
        let location = self.page.borrow().location().clone();
        match interceptor::decide(event, &location) {
            ClickDecision::Ignore => NavigationOutcome::Ignored,
            ClickDecision::PreventOnly => NavigationOutcome::Prevented,
            ClickDecision::Navigate(url) => self.navigate(url, true).await,
        }
    }

    /// Replay an engine-created history entry. Other entries are ignored.
    pub async fn pop_state(&self, event: &PopStateEvent) -> NavigationOutcome {
        if !self.listening.get() {
            return NavigationOutcome::Ignored;
        }
        match history::route_pop_state(event) {
            Some(url) => self.navigate(url, false).await,
            None => NavigationOutcome::Ignored,
        }
    }

    /// Move back one history entry, as the browser's back button does.
    pub async fn back(&self) -> NavigationOutcome {
        let event = self.page.borrow_mut().history_mut().back();
        self.traverse(event).await
    }

    pub async fn forward(&self) -> NavigationOutcome {
        let event = self.page.borrow_mut().history_mut().forward();
        self.traverse(event).await
    }

    async fn traverse(&self, event: Option<PopStateEvent>) -> NavigationOutcome {
        let Some(event) = event else {
            return NavigationOutcome::Ignored;
        };
        self.page.borrow_mut().set_location(event.url.clone());
        self.pop_state(&event).await
    }

    async fn navigate(&self, url: Url, push: bool) -> NavigationOutcome {
        let generation = self.begin();
        info!(url = %url, push, "navigating");
        match self.run(&url, push, generation).await {
            Ok(()) => NavigationOutcome::Applied(url),
            Err(NavigationError::Cancelled) => {
                debug!(url = %url, "navigation superseded");
                NavigationOutcome::Cancelled
            }
            Err(_) if !self.is_current(generation) => NavigationOutcome::Cancelled,
            Err(error) => {
                self.fall_back(&url, &error);
                NavigationOutcome::FullReload {
                    url,
                    error: Some(error),
                }
            }
        }
    }

    fn begin(&self) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.fetcher.cancel();
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.get() == generation
    }

    fn ensure_current(&self, generation: u64) -> Result<(), NavigationError> {
        if self.is_current(generation) {
            Ok(())
        } else {
            Err(NavigationError::Cancelled)
        }
    }

    async fn run(&self, url: &Url, push: bool, generation: u64) -> Result<(), NavigationError> {
        if self.page.borrow().container(&self.container).is_none() {
            return Err(NavigationError::Apply(format!(
                "live document has no element matching `{}`",
                self.container.as_str()
            )));
        }

        self.phase.set(ApplyPhase::Transitioning);
        {
            let mut page = self.page.borrow_mut();
            applier::add_container_class(&mut page, &self.container, TRANSITIONING_CLASS);
        }
        self.update_progress(ProgressIndicator::start);

        sleep(self.config.transition_duration()).await;
        self.ensure_current(generation)?;

        let bundle = self.resolve(url).await?;
        self.ensure_current(generation)?;
        self.update_progress(ProgressIndicator::response_received);

        {
            let mut page = self.page.borrow_mut();
            applier::apply_bundle(&mut page, &self.container, &bundle)?;
            if push {
                let title = page.title();
                history::push(page.history_mut(), url, &title);
            }
            page.set_location(url.clone());
            page.scroll_to(0, ScrollBehavior::Smooth);
            applier::remove_container_class(&mut page, &self.container, TRANSITIONING_CLASS);
            applier::add_container_class(&mut page, &self.container, LOADED_CLASS);
        }
        self.phase.set(ApplyPhase::Applied);
        self.update_progress(ProgressIndicator::complete);
        debug!(url = %url, title = %bundle.title, "content applied");

        let replay = async {
            self.replay_scripts(&bundle.scripts).await;
            self.reinitialize(url);
            if self.is_current(generation) {
                self.phase.set(ApplyPhase::Settled);
            }
        };
        join!(self.finish_visuals(generation), replay);

        if self.is_current(generation) {
            self.phase.set(ApplyPhase::Idle);
        }
        Ok(())
    }

    async fn resolve(&self, url: &Url) -> Result<Rc<PageBundle>, NavigationError> {
        let cached = self.cache.borrow().get(url.as_str());
        if let Some(bundle) = cached {
            debug!(url = %url, "cache hit");
            return Ok(bundle);
        }
        let html = self.fetcher.fetch(url).await?;
        let bundle = Rc::new(extract_bundle(&html, url, &self.container)?);
        self.cache.borrow_mut().put(Rc::clone(&bundle));
        Ok(bundle)
    }

    /// Delayed cosmetic cleanup. Each step is skipped once a newer
    /// navigation owns the visuals.
    async fn finish_visuals(&self, generation: u64) {
        let fade = async {
            sleep(self.config.transition_duration()).await;
            if self.is_current(generation) {
                let mut page = self.page.borrow_mut();
                applier::remove_container_class(&mut page, &self.container, LOADED_CLASS);
            }
        };
        let hide = async {
            sleep(self.config.progress_hide_delay()).await;
            if self.is_current(generation) {
                self.update_progress(ProgressIndicator::hide);
            }
        };
        join!(fade, hide);
    }

    /// Run the bundle's scripts one after another. Failures are logged and
    /// skipped.
    async fn replay_scripts(&self, scripts: &[ScriptDescriptor]) {
        for script in scripts {
            if script.is_external() {
                self.load_external(script).await;
            } else if !script.content.is_empty()
                && should_execute_type(script.script_type.as_deref())
            {
                if let Err(e) = self
                    .runtime
                    .run_inline(&script.content, script.script_type.as_deref())
                {
                    warn!(error = %e, "inline script failed");
                }
            }
        }
    }

    async fn load_external(&self, script: &ScriptDescriptor) {
        let location = self.page.borrow().location().clone();
        let Some(src) = script
            .absolute_src
            .as_deref()
            .and_then(|s| Url::parse(s).ok())
            .or_else(|| normalize_url(script.src.as_deref(), &location))
        else {
            return;
        };
        let key = src.to_string();
        if self.scripts.borrow().contains(&key) {
            trace!(script = %key, "already loaded");
            return;
        }

        applier::append_script_element(&mut self.page.borrow_mut(), &key, script);
        match self.runtime.load_external(&src).await {
            Ok(()) => {
                self.scripts.borrow_mut().insert(key);
            }
            Err(e) => {
                warn!(script = %key, error = %e, "script failed to load");
                applier::remove_script_element(&mut self.page.borrow_mut(), &key);
            }
        }
    }

    fn reinitialize(&self, url: &Url) {
        let ctx = HookContext::new(url);
        self.hooks.borrow().run_all(&mut self.page.borrow_mut(), &ctx);
        self.runtime.document_ready();
        self.listeners.borrow().emit(&Navigated { url: url.clone() });
    }

    fn fall_back(&self, url: &Url, error: &NavigationError) {
        warn!(url = %url, error = %error, "navigation failed, falling back to a full page load");
        self.phase.set(ApplyPhase::Errored);
        self.update_progress(ProgressIndicator::error);
        {
            let mut page = self.page.borrow_mut();
            applier::remove_container_class(&mut page, &self.container, TRANSITIONING_CLASS);
            page.assign(url.clone());
        }
        self.phase.set(ApplyPhase::Idle);
    }

    fn update_progress(&self, step: fn(&mut ProgressIndicator)) {
        let mut progress = self.progress.borrow_mut();
        step(&mut *progress);
        progress.render(self.page.borrow_mut().document_mut());
    }
}
