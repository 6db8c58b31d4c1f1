//! End-of-study notice.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use super::render_utils::{InputHint, OverlayConfig, render_overlay};
use super::{OverlayAction, OverlayUpdate};
use crate::state::TuiState;

#[derive(Debug, Clone, Default)]
pub struct CompletionState;

impl CompletionState {
    pub fn handle_key(&self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        match key.code {
            KeyCode::Char('o') => match &tui.settings.survey_url {
                Some(url) => {
                    OverlayUpdate::stay().with_action(OverlayAction::OpenSurvey { url: url.clone() })
                }
                None => OverlayUpdate::stay(),
            },
            KeyCode::Esc | KeyCode::Enter => OverlayUpdate::close(),
            _ => OverlayUpdate::stay(),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, available_height: u16, tui: &TuiState) {
        let survey = tui.settings.survey_url.as_deref();
        let mut hints = Vec::new();
        if survey.is_some() {
            hints.push(InputHint::new("o", "open survey"));
        }
        hints.push(InputHint::new("Enter", "review records"));
        hints.push(InputHint::new("q", "quit"));

        let layout = render_overlay(
            frame,
            area,
            available_height,
            &OverlayConfig {
                title: "Study complete",
                border_color: Color::Green,
                width: 70,
                height: if survey.is_some() { 10 } else { 8 },
                hints: &hints,
            },
        );

        let mut lines = vec![
            Line::from(Span::styled(
                "Thank you for participating!",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(format!(
                "You answered for all {} websites.",
                tui.session.records().len()
            )),
        ];
        if let Some(url) = survey {
            lines.push(Line::default());
            lines.push(Line::from("Please complete the follow-up survey:"));
            lines.push(Line::from(Span::styled(
                url.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
            )));
        }

        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            layout.body,
        );
    }
}
