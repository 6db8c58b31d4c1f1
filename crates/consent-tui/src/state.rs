//! Application state composition.
//!
//! ```text
//! AppState
//! ├── tui: TuiState
//! │   ├── session: StudySession  (phase, index, records)
//! │   ├── settings: StudySettings (timing, survey link)
//! │   ├── window: WindowState    (what the open site window can report)
//! │   ├── task_seq / tasks       (async task lifecycle)
//! │   └── status: Option<StatusMessage>
//! └── overlay: Option<Overlay>   (response dialog, completion notice)
//! ```
//!
//! State is split between `TuiState` and `Option<Overlay>` so overlay key
//! handlers can take `&mut self` while reading `&TuiState`.

use std::time::{Duration, Instant};

use consent_core::config::Config;
use consent_core::study::StudySession;

use crate::common::{TaskSeq, Tasks};
use crate::overlays::Overlay;

/// How long a transient status message stays visible.
pub const STATUS_TTL: Duration = Duration::from_secs(6);

// ============================================================================
// AppState (Combined State)
// ============================================================================

pub struct AppState {
    pub tui: TuiState,
    pub overlay: Option<Overlay>,
}

impl AppState {
    pub fn new(session: StudySession, settings: StudySettings) -> Self {
        Self {
            tui: TuiState::new(session, settings),
            overlay: None,
        }
    }
}

// ============================================================================
// TuiState
// ============================================================================

pub struct TuiState {
    pub session: StudySession,
    pub settings: StudySettings,
    pub window: WindowState,
    pub task_seq: TaskSeq,
    pub tasks: Tasks,
    pub status: Option<StatusMessage>,
    /// Saves handed to the sink whose outcome has not arrived yet.
    pub pending_saves: usize,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl TuiState {
    pub fn new(session: StudySession, settings: StudySettings) -> Self {
        Self {
            session,
            settings,
            window: WindowState::default(),
            task_seq: TaskSeq::default(),
            tasks: Tasks::default(),
            status: None,
            pending_saves: 0,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
            shown_at: Instant::now(),
        });
    }

    /// Drops the status message once it has been visible for `STATUS_TTL`.
    pub fn expire_status(&mut self, now: Instant) {
        if self
            .status
            .as_ref()
            .is_some_and(|s| now.duration_since(s.shown_at) >= STATUS_TTL)
        {
            self.status = None;
        }
    }
}

/// Static study settings the reducer needs.
#[derive(Debug, Clone)]
pub struct StudySettings {
    pub open_delay: Duration,
    pub poll_interval: Duration,
    pub survey_url: Option<String>,
}

impl StudySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            open_delay: config.open_delay(),
            poll_interval: config.poll_interval(),
            survey_url: config.survey_url.clone(),
        }
    }
}

/// What is known about the current site window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum WindowState {
    /// No window, or one is being opened.
    #[default]
    Pending,
    /// Visible; closure is detected automatically.
    Watched,
    /// Visible; the participant confirms closure with a key.
    NeedsConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    pub shown_at: Instant,
}
