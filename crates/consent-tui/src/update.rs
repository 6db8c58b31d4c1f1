//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects. Session transitions go through
//! `StudySession`, which rejects anything out of order; rejected events are
//! logged and otherwise ignored.

use std::time::{Duration, Instant};

use chrono::Utc;
use consent_core::study::{Advance, Phase, SiteRequest, Submission};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::common::TaskKind;
use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::overlays::{
    CompletionState, Overlay, OverlayAction, OverlayTransition, OverlayUpdate, ResponseDialogState,
};
use crate::state::{AppState, StatusKind, WindowState};

/// The main reducer function.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.tui.spinner_frame = app.tui.spinner_frame.wrapping_add(1);
            app.tui.expire_status(Instant::now());
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
        UiEvent::TaskStarted { kind, started } => {
            if !app.tui.tasks.state_mut(kind).on_started(&started) {
                tracing::debug!(?kind, id = started.id.0, "ignoring start of inactive task");
            }
            vec![]
        }
        UiEvent::TaskCompleted { kind, completed } => {
            if app.tui.tasks.state_mut(kind).finish_if_active(completed.id) {
                update(app, *completed.result)
            } else {
                vec![]
            }
        }
        UiEvent::SiteOpened {
            index,
            at,
            needs_confirmation,
        } => {
            match app.tui.session.site_opened(index, at) {
                Ok(()) => {
                    app.tui.window = if needs_confirmation {
                        WindowState::NeedsConfirmation
                    } else {
                        WindowState::Watched
                    };
                    tracing::info!(index, needs_confirmation, "site opened");
                }
                Err(e) => tracing::warn!(index, error = %e, "ignoring site open"),
            }
            vec![]
        }
        UiEvent::SiteOpenFailed { index, error } => {
            match app.tui.session.open_failed(index, error.clone()) {
                Ok(()) => {
                    app.tui.window = WindowState::Pending;
                    tracing::warn!(index, %error, "site failed to open");
                }
                Err(e) => tracing::warn!(index, error = %e, "ignoring open failure"),
            }
            vec![]
        }
        UiEvent::SiteClosed { index } => close_site(app, index),
        UiEvent::WatchFailed { index, error } => {
            tracing::error!(index, %error, "lost track of site window");
            if app.tui.session.current_index() == Some(index)
                && *app.tui.session.phase() == Phase::SiteOpen
            {
                app.tui.window = WindowState::NeedsConfirmation;
                app.tui.set_status(
                    "Cannot track the browser window. Press c once you have closed it.",
                    StatusKind::Error,
                );
            }
            vec![]
        }
        UiEvent::WatchStopped { index } => {
            tracing::debug!(index, "site watch stopped");
            vec![]
        }
        UiEvent::RecordSaved {
            site_index,
            sink,
            result,
        } => {
            app.tui.pending_saves = app.tui.pending_saves.saturating_sub(1);
            let site = site_index + 1;
            match result {
                Ok(()) => {
                    tracing::info!(site_index, sink, "record saved");
                    app.tui
                        .set_status(format!("Response for site {site} saved."), StatusKind::Info);
                }
                Err(error) => {
                    tracing::error!(site_index, sink, %error, "record save failed");
                    app.tui.set_status(
                        format!("Could not save response for site {site}: {error}"),
                        StatusKind::Error,
                    );
                }
            }
            vec![]
        }
    }
}

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
        _ => vec![],
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if matches!(key.code, KeyCode::Char('q')) || (ctrl && key.code == KeyCode::Char('c')) {
        return quit(app);
    }

    if let Some(overlay) = app.overlay.as_mut() {
        let update = overlay.handle_key(&app.tui, key);
        return apply_overlay_update(app, update);
    }

    let phase = app.tui.session.phase().clone();
    match (phase, key.code) {
        (Phase::NotStarted, KeyCode::Enter) => start_study(app),
        (Phase::OpenFailed { .. }, KeyCode::Char('r')) => retry_open(app),
        (Phase::Completed, KeyCode::Enter) => {
            app.overlay = Some(Overlay::Completion(CompletionState));
            vec![]
        }
        (Phase::Completed, KeyCode::Char('o')) => match &app.tui.settings.survey_url {
            Some(url) => vec![UiEffect::OpenBrowser { url: url.clone() }],
            None => vec![],
        },
        (Phase::SiteOpen, KeyCode::Char('c'))
            if app.tui.window == WindowState::NeedsConfirmation =>
        {
            match app.tui.session.current_index() {
                Some(index) => close_site(app, index),
                None => vec![],
            }
        }
        _ => vec![],
    }
}

fn apply_overlay_update(app: &mut AppState, update: OverlayUpdate) -> Vec<UiEffect> {
    let effects = match update.action {
        Some(OverlayAction::Submit { option_id }) => submit_response(app, &option_id),
        Some(OverlayAction::OpenSurvey { url }) => vec![UiEffect::OpenBrowser { url }],
        None => vec![],
    };
    if update.transition == OverlayTransition::Close {
        app.overlay = None;
    }
    effects
}

// ============================================================================
// Study transitions
// ============================================================================

fn start_study(app: &mut AppState) -> Vec<UiEffect> {
    match app.tui.session.start() {
        Ok(request) => {
            tracing::info!(
                participant = app.tui.session.participant_id().unwrap_or_default(),
                sites = app.tui.session.sites().len(),
                "study started"
            );
            vec![open_site(app, request, Duration::ZERO)]
        }
        Err(e) => {
            app.tui.set_status(e.to_string(), StatusKind::Error);
            vec![]
        }
    }
}

fn retry_open(app: &mut AppState) -> Vec<UiEffect> {
    match app.tui.session.retry_open() {
        Ok(request) => {
            tracing::info!(index = request.index, "retrying site open");
            app.tui.status = None;
            vec![open_site(app, request, Duration::ZERO)]
        }
        Err(e) => {
            tracing::warn!(error = %e, "retry rejected");
            vec![]
        }
    }
}

/// Moves the current site to `AwaitingResponse` and shows the dialog.
fn close_site(app: &mut AppState, index: usize) -> Vec<UiEffect> {
    if let Err(e) = app.tui.session.site_closed(index) {
        tracing::debug!(index, error = %e, "ignoring site closure");
        return vec![];
    }
    tracing::info!(index, "site closed");

    app.tui.window = WindowState::Pending;
    app.overlay = Some(Overlay::Response(ResponseDialogState::open()));

    match app.tui.tasks.site_watch.take_cancel() {
        Some(token) => vec![UiEffect::CancelTask {
            kind: TaskKind::SiteWatch,
            token: Some(token),
        }],
        None => vec![],
    }
}

fn submit_response(app: &mut AppState, option_id: &str) -> Vec<UiEffect> {
    let Submission { record, advance } =
        match app.tui.session.submit_response(Some(option_id), Utc::now()) {
            Ok(submission) => submission,
            Err(e) => {
                if let Some(dialog) = app.overlay.as_mut().and_then(Overlay::as_response_mut) {
                    dialog.notice = Some(e.to_string());
                }
                return vec![];
            }
        };

    tracing::info!(
        site_index = record.site_index,
        website = %record.website,
        selection = %record.selection,
        time_spent = record.time_spent_seconds,
        "response recorded"
    );

    app.tui.pending_saves += 1;
    let mut effects = vec![UiEffect::SaveRecord { record }];

    match advance {
        Advance::Next(request) => {
            app.overlay = None;
            let delay = app.tui.settings.open_delay;
            effects.push(open_site(app, request, delay));
        }
        Advance::Completed => {
            tracing::info!(records = app.tui.session.records().len(), "study completed");
            app.overlay = Some(Overlay::Completion(CompletionState));
        }
    }
    effects
}

fn open_site(app: &mut AppState, request: SiteRequest, delay: Duration) -> UiEffect {
    app.tui.window = WindowState::Pending;
    let task = app.tui.task_seq.next_id();
    let cancel = app.tui.tasks.site_watch.begin(task);
    UiEffect::OpenSite {
        task,
        request,
        delay,
        cancel,
    }
}

fn quit(app: &mut AppState) -> Vec<UiEffect> {
    tracing::info!(
        position = app.tui.session.position(),
        phase = app.tui.session.phase().name(),
        watching = app.tui.tasks.site_watch.is_running(),
        "participant quit"
    );
    let mut effects = Vec::new();
    if let Some(token) = app.tui.tasks.site_watch.take_cancel() {
        effects.push(UiEffect::CancelTask {
            kind: TaskKind::SiteWatch,
            token: Some(token),
        });
    }
    effects.push(UiEffect::Quit);
    effects
}
