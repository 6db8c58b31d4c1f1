//! Full-screen terminal UI for running a consent study.

pub mod common;
pub mod effects;
pub mod events;
pub mod overlays;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use consent_core::config::Config;
use consent_core::launcher::SiteLauncher;
use consent_core::sink::RecordSink;
use consent_core::study::{InteractionRecord, StudySession};
pub use runtime::TuiRuntime;
use tokio::task::JoinHandle;

use crate::state::StudySettings;

/// How long to wait for in-flight saves after the participant quits.
pub const SAVE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// What a finished (or abandoned) study produced.
#[derive(Debug, Clone)]
pub struct StudyOutcome {
    pub participant_id: Option<String>,
    pub records: Vec<InteractionRecord>,
    pub total_sites: usize,
    pub completed: bool,
}

/// Runs one participant through the configured sites.
///
/// # Errors
/// Returns an error if stdout is not a terminal, the configuration has no
/// sites or options, or terminal I/O fails.
pub async fn run_study(
    config: &Config,
    sink: Arc<dyn RecordSink>,
    launcher: Arc<dyn SiteLauncher>,
) -> Result<StudyOutcome> {
    if !stdout().is_terminal() {
        anyhow::bail!(
            "The study requires a terminal.\n\
             Use `consent sites` to inspect the configuration non-interactively."
        );
    }

    let session = StudySession::from_config(config)?;
    let mut runtime = TuiRuntime::new(session, StudySettings::from_config(config), sink, launcher)?;

    let result = runtime.run();
    let pending = runtime.take_pending_saves();
    let session = runtime.state.tui.session.clone();
    // Restores the terminal before waiting on the network.
    drop(runtime);
    result?;

    flush_saves(pending, SAVE_FLUSH_TIMEOUT).await;

    Ok(StudyOutcome {
        participant_id: session.participant_id().map(ToString::to_string),
        records: session.records().to_vec(),
        total_sites: session.sites().len(),
        completed: session.is_completed(),
    })
}

/// Waits for outstanding saves until `timeout` elapses.
async fn flush_saves(pending: Vec<JoinHandle<()>>, timeout: Duration) {
    if pending.is_empty() {
        return;
    }
    tracing::info!(count = pending.len(), "waiting for pending saves");

    let deadline = tokio::time::Instant::now() + timeout;
    let mut abandoned = 0;
    for handle in pending {
        if tokio::time::timeout_at(deadline, handle).await.is_err() {
            abandoned += 1;
        }
    }
    if abandoned > 0 {
        tracing::warn!(abandoned, "saves still in flight at exit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_flush_saves_gives_up_after_timeout() {
        let fast = tokio::spawn(async {});
        let slow = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let started = tokio::time::Instant::now();
        flush_saves(vec![fast, slow], Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(6));
    }
}
