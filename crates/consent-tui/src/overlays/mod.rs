//! Overlay modules for the TUI.
//!
//! Overlays are modal UI components that temporarily take over keyboard input.
//! Each overlay owns its state, key handler, and render function.
//!
//! - `response.rs`: the "which option did you choose?" dialog
//! - `completion.rs`: the end-of-study notice with the survey link
//! - `render_utils.rs`: shared rendering helpers

pub mod completion;
pub mod render_utils;
pub mod response;

pub use completion::CompletionState;
use crossterm::event::KeyEvent;
use ratatui::Frame;
use ratatui::layout::Rect;
pub use response::ResponseDialogState;

use crate::state::TuiState;

// ============================================================================
// OverlayUpdate
// ============================================================================

/// Transition returned by overlay key handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayTransition {
    Stay,
    Close,
}

/// Requests an overlay makes of the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayAction {
    /// Submit the chosen response option (by id).
    Submit { option_id: String },
    OpenSurvey { url: String },
}

/// Update returned by overlay key handlers.
#[derive(Debug)]
pub struct OverlayUpdate {
    pub transition: OverlayTransition,
    pub action: Option<OverlayAction>,
}

impl OverlayUpdate {
    pub fn stay() -> Self {
        Self {
            transition: OverlayTransition::Stay,
            action: None,
        }
    }

    pub fn close() -> Self {
        Self {
            transition: OverlayTransition::Close,
            action: None,
        }
    }

    #[must_use]
    pub fn with_action(mut self, action: OverlayAction) -> Self {
        self.action = Some(action);
        self
    }
}

// ============================================================================
// Overlay
// ============================================================================

#[derive(Debug)]
pub enum Overlay {
    Response(ResponseDialogState),
    Completion(CompletionState),
}

impl Overlay {
    pub fn render(&self, frame: &mut Frame, area: Rect, available_height: u16, tui: &TuiState) {
        match self {
            Overlay::Response(d) => d.render(frame, area, available_height, tui),
            Overlay::Completion(c) => c.render(frame, area, available_height, tui),
        }
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        match self {
            Overlay::Response(d) => d.handle_key(tui, key),
            Overlay::Completion(c) => c.handle_key(tui, key),
        }
    }

    pub fn as_response_mut(&mut self) -> Option<&mut ResponseDialogState> {
        match self {
            Overlay::Response(d) => Some(d),
            Overlay::Completion(_) => None,
        }
    }
}

// ============================================================================
// OverlayExt - Extension trait for Option<Overlay>
// ============================================================================

pub trait OverlayExt {
    fn render(&self, frame: &mut Frame, area: Rect, available_height: u16, tui: &TuiState);
}

impl OverlayExt for Option<Overlay> {
    fn render(&self, frame: &mut Frame, area: Rect, available_height: u16, tui: &TuiState) {
        if let Some(overlay) = self {
            overlay.render(frame, area, available_height, tui);
        }
    }
}
