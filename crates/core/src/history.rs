//! Session history: the headless back/forward stack and the state tag the
//! engine attaches to entries it owns.

use serde::{Deserialize, Serialize};
use url::Url;

/// State stored on history entries created by the engine. Serialized as
/// `{"pjax": true, "url": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    #[serde(rename = "pjax")]
    pub engine_originated: bool,
    pub url: String,
}

impl HistoryState {
    pub fn tagged(url: &Url) -> Self {
        Self {
            engine_originated: true,
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: Url,
    pub title: String,
    pub state: Option<HistoryState>,
}

/// Delivered when the session moves to another entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PopStateEvent {
    pub url: Url,
    pub state: Option<HistoryState>,
}

/// A browser-style history stack with a cursor.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl SessionHistory {
    pub fn new(url: Url) -> Self {
        Self {
            entries: vec![HistoryEntry {
                url,
                title: String::new(),
                state: None,
            }],
            index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.index)
    }

    /// Add an entry after the current one, dropping any forward entries.
    pub fn push_state(&mut self, state: Option<HistoryState>, title: &str, url: Url) {
        self.entries.truncate(self.index + 1);
        self.entries.push(HistoryEntry {
            url,
            title: title.to_string(),
            state,
        });
        self.index = self.entries.len() - 1;
    }

    pub fn replace_state(&mut self, state: Option<HistoryState>, title: &str, url: Url) {
        let entry = HistoryEntry {
            url,
            title: title.to_string(),
            state,
        };
        match self.entries.get_mut(self.index) {
            Some(slot) => *slot = entry,
            None => {
                self.entries.push(entry);
                self.index = self.entries.len() - 1;
            }
        }
    }

    /// Step back one entry. `None` at the start of the stack.
    pub fn back(&mut self) -> Option<PopStateEvent> {
        let target = self.index.checked_sub(1)?;
        self.go_to(target)
    }

    pub fn forward(&mut self) -> Option<PopStateEvent> {
        let target = self.index + 1;
        if target >= self.entries.len() {
            return None;
        }
        self.go_to(target)
    }

    fn go_to(&mut self, index: usize) -> Option<PopStateEvent> {
        let entry = self.entries.get(index)?;
        self.index = index;
        Some(PopStateEvent {
            url: entry.url.clone(),
            state: entry.state.clone(),
        })
    }
}

/// Record a user-initiated navigation as a new tagged entry.
pub fn push(history: &mut SessionHistory, url: &Url, title: &str) {
    history.push_state(Some(HistoryState::tagged(url)), title, url.clone());
}

/// Tag the current entry in place.
pub fn replace(history: &mut SessionHistory, url: &Url, title: &str) {
    history.replace_state(Some(HistoryState::tagged(url)), title, url.clone());
}

/// URL to replay for a pop-state event, or `None` when the entry was not
/// created by the engine.
pub fn route_pop_state(event: &PopStateEvent) -> Option<Url> {
    let state = event.state.as_ref().filter(|s| s.engine_originated)?;
    Url::parse(&state.url).ok()
}
