//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They cover I/O and task spawning only; the reducer never opens a browser,
//! touches the sink, or spawns anything itself.
//!
//! Cancellation is initiated from the reducer via `UiEffect::CancelTask` and
//! executed by the runtime calling `token.cancel()`.

use std::time::Duration;

use consent_core::study::{InteractionRecord, SiteRequest};
use tokio_util::sync::CancellationToken;

use crate::common::{TaskId, TaskKind};

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    /// Open a site after `delay`, then watch its window until it closes.
    ///
    /// `cancel` is already registered in `Tasks`, so the reducer can stop the
    /// watch before the runtime reports it as started.
    OpenSite {
        task: TaskId,
        request: SiteRequest,
        delay: Duration,
        cancel: CancellationToken,
    },

    /// Cancel a running task.
    CancelTask {
        kind: TaskKind,
        token: Option<CancellationToken>,
    },

    /// Hand a record to the sink on a detached task.
    SaveRecord { record: InteractionRecord },

    /// Open a URL in the system browser (survey link).
    OpenBrowser { url: String },
}
