//! UI event types.
//!
//! Everything the reducer reacts to arrives as a `UiEvent`: terminal input,
//! timer ticks, and results sent back by runtime handlers through the inbox.

use chrono::{DateTime, Utc};
use crossterm::event::Event;

use crate::common::{TaskCompleted, TaskKind, TaskStarted};

#[derive(Debug)]
pub enum UiEvent {
    /// Periodic tick; drives redraws and status expiry.
    Tick,
    Terminal(Event),

    TaskStarted {
        kind: TaskKind,
        started: TaskStarted,
    },
    TaskCompleted {
        kind: TaskKind,
        completed: TaskCompleted<Box<UiEvent>>,
    },

    /// The site window for `index` is visible.
    SiteOpened {
        index: usize,
        at: DateTime<Utc>,
        needs_confirmation: bool,
    },
    /// The environment refused to open the site for `index`.
    SiteOpenFailed { index: usize, error: String },
    /// The site window for `index` was observed closed.
    SiteClosed { index: usize },
    /// Window liveness could not be checked; closure must be confirmed by hand.
    WatchFailed { index: usize, error: String },
    /// The watch ended without observing closure (cancelled).
    WatchStopped { index: usize },

    /// Outcome of a detached sink save.
    RecordSaved {
        site_index: usize,
        sink: &'static str,
        result: Result<(), String>,
    },
}
