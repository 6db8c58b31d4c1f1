//! TUI runtime - owns terminal, runs event loop, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! Handlers send `UiEvent`s to `inbox_tx`; the runtime drains `inbox_rx`
//! each frame alongside terminal input.

mod handlers;
mod inbox;

use std::future::Future;
use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use consent_core::launcher::SiteLauncher;
use consent_core::sink::RecordSink;
use consent_core::study::StudySession;
use crossterm::event;
use inbox::{UiEventReceiver, UiEventSender};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::common::{TaskCompleted, TaskId, TaskKind, TaskStarted};
use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::{AppState, StudySettings};
use crate::{render, terminal, update};

/// Tick cadence; also caps the redraw rate.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Full-screen TUI runtime.
///
/// Terminal state is restored on drop or panic.
pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    inbox_tx: UiEventSender,
    inbox_rx: UiEventReceiver,
    last_tick: Instant,
    launcher: Arc<dyn SiteLauncher>,
    sink: Arc<dyn RecordSink>,
    /// Detached sink saves, kept so they can be awaited on exit.
    saves: Vec<JoinHandle<()>>,
}

impl TuiRuntime {
    /// Creates a new TUI runtime and enters the alternate screen.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be set up.
    pub fn new(
        session: StudySession,
        settings: StudySettings,
        sink: Arc<dyn RecordSink>,
        launcher: Arc<dyn SiteLauncher>,
    ) -> Result<Self> {
        // Set up panic hook BEFORE entering alternate screen
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            state: AppState::new(session, settings),
            inbox_tx,
            inbox_rx,
            last_tick: Instant::now(),
            launcher,
            sink,
            saves: Vec::new(),
        })
    }

    /// Runs the main event loop until the participant quits.
    ///
    /// # Errors
    /// Returns an error if terminal I/O fails.
    pub fn run(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.tui.should_quit {
            let events = self.collect_events()?;

            for event in events {
                dirty = true;
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| {
                    render::render(&self.state, frame);
                })?;
                dirty = false;
            }
        }

        Ok(())
    }

    /// Hands over the sink saves that were still tracked at exit.
    pub fn take_pending_saves(&mut self) -> Vec<JoinHandle<()>> {
        self.saves.retain(|handle| !handle.is_finished());
        std::mem::take(&mut self.saves)
    }

    // ========================================================================
    // Event Collection
    // ========================================================================

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        while let Ok(ev) = self.inbox_rx.try_recv() {
            events.push(ev);
        }

        // Block until the next tick unless there is already work to do.
        let poll_duration = if events.is_empty() {
            TICK_INTERVAL.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= TICK_INTERVAL {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Spawns an async effect and sends its result event when complete.
    fn spawn_effect<F, Fut>(&self, f: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(f().await);
        })
    }

    /// Spawns an async task with a uniform TaskStarted/TaskCompleted lifecycle.
    fn spawn_task<F, Fut>(
        &self,
        kind: TaskKind,
        id: TaskId,
        cancel: Option<CancellationToken>,
        f: F,
    ) where
        F: FnOnce(Option<CancellationToken>) -> Fut + Send + 'static,
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        let started = TaskStarted {
            id,
            cancel: cancel.clone(),
        };
        let _ = tx.send(UiEvent::TaskStarted { kind, started });
        tokio::spawn(async move {
            let inner = f(cancel).await;
            let completed = TaskCompleted {
                id,
                result: Box::new(inner),
            };
            let _ = tx.send(UiEvent::TaskCompleted { kind, completed });
        });
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.tui.should_quit = true;
            }
            UiEffect::OpenBrowser { url } => {
                if let Err(e) = open::that_detached(&url) {
                    tracing::warn!(%url, error = %e, "failed to open survey link");
                }
            }
            UiEffect::CancelTask { token, .. } => {
                if let Some(cancel) = token {
                    cancel.cancel();
                }
            }
            UiEffect::OpenSite {
                task,
                request,
                delay,
                cancel,
            } => {
                let launcher = Arc::clone(&self.launcher);
                let poll_interval = self.state.tui.settings.poll_interval;
                let inbox = self.inbox_tx.clone();
                self.spawn_task(TaskKind::SiteWatch, task, Some(cancel), move |cancel| {
                    handlers::watch_site(launcher, request, delay, poll_interval, inbox, cancel)
                });
            }
            UiEffect::SaveRecord { record } => {
                let sink = Arc::clone(&self.sink);
                let handle = self.spawn_effect(move || handlers::save_record(sink, record));
                self.saves.retain(|h| !h.is_finished());
                self.saves.push(handle);
            }
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}
