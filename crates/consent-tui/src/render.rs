//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui `Frame`, and never
//! mutate state or return effects.

use chrono::Utc;
use consent_core::study::{InteractionRecord, LEADING_COLUMNS, Phase, ResponseOption, table_header};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::common::truncate_with_ellipsis;
use crate::overlays::OverlayExt;
use crate::overlays::render_utils::{InputHint, hint_spans};
use crate::state::{AppState, StatusKind, TuiState, WindowState};

const HEADER_HEIGHT: u16 = 1;
const FOOTER_HEIGHT: u16 = 1;
const STATUS_PANEL_HEIGHT: u16 = 5;

/// Width of the User ID column; ids are truncated to fit.
const USER_ID_WIDTH: u16 = 14;
const TIMESTAMP_WIDTH: u16 = 19;
const TIME_SPENT_WIDTH: u16 = 10;

const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

/// Renders the entire TUI to the frame.
pub fn render(app: &AppState, frame: &mut Frame) {
    let area = frame.area();
    let state = &app.tui;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(area);

    render_header(state, frame, chunks[0]);

    if *state.session.phase() == Phase::NotStarted {
        render_welcome(state, frame, chunks[1]);
    } else {
        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(STATUS_PANEL_HEIGHT),
                Constraint::Min(3),
            ])
            .split(chunks[1]);
        render_status_panel(state, frame, body[0]);
        render_records_table(state, frame, body[1]);
    }

    render_footer(state, frame, chunks[2]);

    app.overlay.render(frame, area, chunks[2].y, state);
}

fn render_header(state: &TuiState, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        " Cookie Consent Study",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if let Some(id) = state.session.participant_id() {
        spans.push(Span::styled(
            format!("  participant {id}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_welcome(state: &TuiState, frame: &mut Frame, area: Rect) {
    let n = state.session.sites().len();
    let lines = vec![
        Line::from(Span::styled(
            "Welcome, and thank you for taking part.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(format!(
            "You will visit {n} websites, one at a time. Each opens in its own browser window."
        )),
        Line::from(
            "On each site, respond to the cookie banner as you normally would, then close the window.",
        ),
        Line::from("Once the window is closed, tell us which option you chose."),
        Line::default(),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled(
                "Enter",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" to participate."),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let para = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(para, area);
}

fn render_status_panel(state: &TuiState, frame: &mut Frame, area: Rect) {
    let session = &state.session;
    let total = session.sites().len();
    let k = session.current_index().map_or(0, |i| (i + 1).min(total));
    let inner_width = area.width.saturating_sub(4) as usize;

    let site_line = match session.current_site() {
        Some(url) => Line::from(vec![
            Span::styled(
                format!("Site {k} of {total}  "),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                truncate_with_ellipsis(url, inner_width.saturating_sub(16)),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        None => Line::from(Span::styled(
            format!("All {total} sites visited"),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    };

    let detail = match session.phase() {
        Phase::SiteOpen => match state.window {
            WindowState::Pending => {
                let spinner = SPINNER_FRAMES[state.spinner_frame % SPINNER_FRAMES.len()];
                Line::from(format!("{spinner} Opening the site…"))
            }
            WindowState::Watched => Line::from(format!(
                "Respond to the cookie banner, then close the browser window.  Open for {}s",
                elapsed_seconds(state)
            )),
            WindowState::NeedsConfirmation => Line::from(vec![
                Span::raw("Respond to the cookie banner and close the browser tab, then press "),
                Span::styled("c", Style::default().fg(Color::Cyan)),
                Span::raw(format!(".  Open for {}s", elapsed_seconds(state))),
            ]),
        },
        Phase::OpenFailed { reason } => Line::from(vec![
            Span::styled(
                format!("Could not open the site: {reason}.  "),
                Style::default().fg(Color::Red),
            ),
            Span::raw("Press "),
            Span::styled("r", Style::default().fg(Color::Cyan)),
            Span::raw(" to retry."),
        ]),
        Phase::AwaitingResponse => Line::from("Which option did you choose?"),
        Phase::Completed => Line::from(Span::styled(
            "Study complete. Thank you!",
            Style::default().fg(Color::Green),
        )),
        Phase::NotStarted => Line::default(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", session.phase().name()));
    let para = Paragraph::new(vec![site_line, detail])
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(para, area);
}

fn elapsed_seconds(state: &TuiState) -> i64 {
    state
        .session
        .opened_at()
        .map_or(0, |opened| (Utc::now() - opened).num_seconds().max(0))
}

fn render_records_table(state: &TuiState, frame: &mut Frame, area: Rect) {
    let options = state.session.options();

    let header = table_header(options).into_iter().map(Cell::from);

    let mut widths = vec![
        Constraint::Length(USER_ID_WIDTH),
        Constraint::Length(TIMESTAMP_WIDTH),
        Constraint::Fill(1),
    ];
    widths.extend(
        options
            .iter()
            .map(|o| Constraint::Length(o.label.width().max(3) as u16)),
    );
    widths.push(Constraint::Length(TIME_SPENT_WIDTH));

    let rows = state
        .session
        .records()
        .iter()
        .map(|record| Row::new(record_cells(record, options)));

    let table = Table::new(rows, widths)
        .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
        .column_spacing(1)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(format!(" Responses ({}) ", state.session.records().len())),
        );
    frame.render_widget(table, area);
}

/// One table row; the id is truncated and checks are highlighted.
fn record_cells<'a>(record: &InteractionRecord, options: &[ResponseOption]) -> Vec<Cell<'a>> {
    let checks = LEADING_COLUMNS.len()..LEADING_COLUMNS.len() + options.len();
    record
        .table_row(options)
        .into_iter()
        .enumerate()
        .map(|(i, text)| match i {
            0 => Cell::from(truncate_with_ellipsis(&text, USER_ID_WIDTH as usize)),
            i if checks.contains(&i) && !text.is_empty() => {
                Cell::from(Span::styled(text, Style::default().fg(Color::Green)))
            }
            _ => Cell::from(text),
        })
        .collect()
}

fn render_footer(state: &TuiState, frame: &mut Frame, area: Rect) {
    if let Some(status) = &state.status {
        let color = match status.kind {
            StatusKind::Info => Color::Green,
            StatusKind::Error => Color::Red,
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                truncate_with_ellipsis(&status.text, area.width as usize),
                Style::default().fg(color),
            )),
            area,
        );
        return;
    }

    let hints: Vec<InputHint> = match state.session.phase() {
        Phase::NotStarted => vec![
            InputHint::new("Enter", "participate"),
            InputHint::new("q", "quit"),
        ],
        Phase::SiteOpen if state.window == WindowState::NeedsConfirmation => vec![
            InputHint::new("c", "window closed"),
            InputHint::new("q", "quit"),
        ],
        Phase::OpenFailed { .. } => {
            vec![InputHint::new("r", "retry"), InputHint::new("q", "quit")]
        }
        Phase::Completed => {
            let mut hints = Vec::new();
            if state.settings.survey_url.is_some() {
                hints.push(InputHint::new("o", "open survey"));
            }
            hints.push(InputHint::new("Enter", "summary"));
            hints.push(InputHint::new("q", "quit"));
            hints
        }
        _ => vec![InputHint::new("q", "quit")],
    };
    frame.render_widget(
        Paragraph::new(Line::from(hint_spans(&hints, Color::Cyan))).alignment(Alignment::Center),
        area,
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use consent_core::study::StudySession;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::state::StudySettings;

    fn app() -> AppState {
        let session = StudySession::new(
            vec![
                "https://a.example".to_string(),
                "https://b.example".to_string(),
            ],
            vec![
                ResponseOption::new("accept-all", "Accept All"),
                ResponseOption::new("reject-all", "Reject All"),
            ],
        )
        .unwrap();
        AppState::new(
            session,
            StudySettings {
                open_delay: Duration::from_millis(500),
                poll_interval: Duration::from_millis(500),
                survey_url: None,
            },
        )
    }

    fn draw(app: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_welcome_screen_invites_participation() {
        let screen = draw(&app());
        assert!(screen.contains("You will visit 2 websites"));
        assert!(screen.contains("to participate"));
    }

    #[test]
    fn test_table_lists_records_with_option_columns() {
        let mut app = app();
        app.tui.session.start_as("user_abc".to_string()).unwrap();
        app.tui.session.site_opened(0, Utc::now()).unwrap();
        app.tui.session.site_closed(0).unwrap();
        app.tui
            .session
            .submit_response(Some("reject-all"), Utc::now())
            .unwrap();

        let screen = draw(&app);
        assert!(screen.contains("Site 2 of 2"));
        assert!(screen.contains("User ID"));
        assert!(screen.contains("Accept All"));
        assert!(screen.contains("Reject All"));
        assert!(screen.contains("https://a.example"));
        assert!(screen.contains("✓"));
        assert!(screen.contains("Responses (1)"));
    }

    #[test]
    fn test_open_failure_shows_retry() {
        let mut app = app();
        app.tui.session.start().unwrap();
        app.tui
            .session
            .open_failed(0, "failed to start browser `firefox`".to_string())
            .unwrap();

        let screen = draw(&app);
        assert!(screen.contains("Could not open the site"));
        assert!(screen.contains("retry"));
    }

    #[test]
    fn test_record_cells_mark_only_selected_option() {
        let options = vec![
            ResponseOption::new("accept-all", "Accept All"),
            ResponseOption::new("reject-all", "Reject All"),
        ];
        let record = InteractionRecord {
            participant_id: "user_0123456789abcdef".to_string(),
            timestamp: Utc::now(),
            site_index: 0,
            website: "https://a.example".to_string(),
            selection: "Reject All".to_string(),
            time_spent_seconds: 12,
        };
        let cells = record_cells(&record, &options);
        // id, timestamp, website, two options, time spent
        assert_eq!(cells.len(), 6);
    }
}
