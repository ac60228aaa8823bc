//! Headless PJAX-style navigation: fetch a same-origin page, pull out its
//! reusable parts and splice them into the live page without a reload.
//!
//! [`Engine`] is the entry point. It owns a [`Page`] and drives navigation
//! through a [`fetch::Transport`] and a [`ScriptRuntime`].

pub mod applier;
pub mod bundle;
pub mod cache;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod history;
pub mod hooks;
pub mod interceptor;
pub mod normalize;
pub mod page;
pub mod progress;
pub mod scripts;

pub use applier::ApplyPhase;
pub use bundle::PageBundle;
pub use config::EngineConfig;
pub use engine::{Engine, NavigationOutcome};
pub use error::{ConfigError, NavigationError, ScriptError, TransportError};
pub use extract::extract_bundle;
pub use hooks::{HookContext, Navigated};
pub use interceptor::{Anchor, ClickEvent};
pub use page::Page;
pub use progress::ProgressState;
pub use scripts::{NoopRuntime, ScriptRuntime};
