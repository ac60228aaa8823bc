//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dom::SelectorList;
use crate::error::ConfigError;

/// Tunables for the navigation engine. Every field has a default, so a JSON
/// config only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Selector of the swappable main content region.
    pub container_selector: String,
    /// Length of the fade-out/fade-in animation, in milliseconds.
    pub transition_duration_ms: u64,
    /// How long a completed progress bar stays visible, in milliseconds.
    pub progress_hide_delay_ms: u64,
    pub enable_progress_bar: bool,
    /// Maximum number of cached page bundles. Zero disables caching.
    pub cache_size: usize,
    /// Kill switch: when false every navigation is a full page load.
    pub enabled: bool,
    /// Marker header sent with every engine fetch.
    pub request_header: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            container_selector: ".container".to_string(),
            transition_duration_ms: 300,
            progress_hide_delay_ms: 300,
            enable_progress_bar: true,
            cache_size: 10,
            enabled: true,
            request_header: "X-PJAX".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.container()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The parsed container selector.
    pub fn container(&self) -> Result<SelectorList, ConfigError> {
        SelectorList::parse(&self.container_selector)
            .ok_or_else(|| ConfigError::Selector(self.container_selector.clone()))
    }

    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_duration_ms)
    }

    pub fn progress_hide_delay(&self) -> Duration {
        Duration::from_millis(self.progress_hide_delay_ms)
    }
}
