//! Cosmetic loading bar. Has no effect on navigation correctness.

use crate::dom::DomNode;

pub(crate) const BAR_CLASS: &str = "pjax-progress-bar";
const FILL_CLASS: &str = "pjax-progress-fill";
/// Marks the permanent style block so style replacement leaves it alone.
pub(crate) const STYLE_MARKER: &str = "data-pjax-progress";

const PROGRESS_CSS: &str = "
.pjax-progress-bar { position: fixed; top: 0; left: 0; right: 0; height: 3px; z-index: 9999; opacity: 0; transition: opacity 0.2s ease; }
.pjax-progress-bar.active { opacity: 1; }
.pjax-progress-fill { height: 100%; background: linear-gradient(90deg, #6366f1, #8b5cf6); transition: width 0.3s ease; width: 0%; }
.pjax-transitioning { opacity: 0; transform: translateY(10px); }
.pjax-loaded { animation: pjaxFadeIn 0.3s ease forwards; }
@keyframes pjaxFadeIn { from { opacity: 0; transform: translateY(10px); } to { opacity: 1; transform: translateY(0); } }
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Hidden,
    /// Visible, filled to the given percentage.
    Active(u8),
}

/// `Hidden → Active(30) → Active(60) → Active(100) → Hidden`, or straight
/// back to `Hidden` on error.
#[derive(Debug)]
pub struct ProgressIndicator {
    enabled: bool,
    state: ProgressState,
    trail: Vec<ProgressState>,
}

impl ProgressIndicator {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: ProgressState::Hidden,
            trail: vec![ProgressState::Hidden],
        }
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    /// Every state entered since the last `start`, for diagnostics.
    pub fn trail(&self) -> &[ProgressState] {
        &self.trail
    }

    /// Fetch started.
    pub fn start(&mut self) {
        self.trail.clear();
        self.enter(ProgressState::Active(30));
    }

    /// Page content is in hand.
    pub fn response_received(&mut self) {
        if self.is_active() {
            self.enter(ProgressState::Active(60));
        }
    }

    /// Content applied.
    pub fn complete(&mut self) {
        if self.is_active() {
            self.enter(ProgressState::Active(100));
        }
    }

    /// Completion delay elapsed.
    pub fn hide(&mut self) {
        if self.state != ProgressState::Hidden {
            self.enter(ProgressState::Hidden);
        }
    }

    /// Abort without reaching 100%.
    pub fn error(&mut self) {
        self.hide();
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ProgressState::Active(_))
    }

    fn enter(&mut self, state: ProgressState) {
        self.state = state;
        self.trail.push(state);
    }

    /// Add the bar and its permanent style to a document, once.
    pub fn install(&self, document: &mut DomNode) {
        if !self.enabled {
            return;
        }
        if let Some(head) = document.find_mut(&|n| n.is_tag("head")) {
            if !head.children.iter().any(|c| c.has_attr(STYLE_MARKER)) {
                head.children.push(
                    DomNode::new_element("style")
                        .with_attr(STYLE_MARKER, "true")
                        .with_child(DomNode::new_text(PROGRESS_CSS)),
                );
            }
        }
        if let Some(body) = document.find_mut(&|n| n.is_tag("body")) {
            if !body.children.iter().any(|c| c.has_class(BAR_CLASS)) {
                body.children.push(
                    DomNode::new_element("div")
                        .with_attr("class", BAR_CLASS)
                        .with_child(
                            DomNode::new_element("div")
                                .with_attr("class", FILL_CLASS)
                                .with_attr("style", "width: 0%"),
                        ),
                );
            }
        }
    }

    /// Mirror the current state onto the installed bar.
    pub fn render(&self, document: &mut DomNode) {
        if !self.enabled {
            return;
        }
        let Some(bar) = document.find_mut(&|n| n.is_element() && n.has_class(BAR_CLASS)) else {
            return;
        };
        let width = match self.state {
            ProgressState::Active(pct) => {
                bar.add_class("active");
                pct
            }
            ProgressState::Hidden => {
                bar.remove_class("active");
                0
            }
        };
        if let Some(fill) = bar.find_mut(&|n| n.is_element() && n.has_class(FILL_CLASS)) {
            fill.set_attr("style", &format!("width: {width}%"));
        }
    }
}
