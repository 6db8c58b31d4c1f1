//! Response dialog: asks which consent option the participant chose.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use super::render_utils::{InputHint, OverlayConfig, render_overlay};
use super::{OverlayAction, OverlayUpdate};
use crate::common::truncate_with_ellipsis;
use crate::state::TuiState;

const DIALOG_WIDTH: u16 = 64;

#[derive(Debug, Clone, Default)]
pub struct ResponseDialogState {
    /// Highlighted option; `None` until the participant picks one.
    pub selected: Option<usize>,
    /// Inline notice (e.g. Enter pressed with nothing selected).
    pub notice: Option<String>,
}

impl ResponseDialogState {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        let options = tui.session.options();
        let count = options.len();

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = Some(match self.selected {
                    Some(0) | None => count.saturating_sub(1),
                    Some(i) => i - 1,
                });
                self.notice = None;
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.selected = Some(match self.selected {
                    Some(i) if i + 1 < count => i + 1,
                    _ => 0,
                });
                self.notice = None;
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let n = c.to_digit(10).unwrap_or(0) as usize;
                if (1..=count).contains(&n) {
                    self.selected = Some(n - 1);
                    self.notice = None;
                }
            }
            KeyCode::Enter => match self.selected.and_then(|i| options.get(i)) {
                Some(option) => {
                    return OverlayUpdate::stay().with_action(OverlayAction::Submit {
                        option_id: option.id.clone(),
                    });
                }
                None => self.notice = Some("Select an option first.".to_string()),
            },
            _ => {}
        }
        OverlayUpdate::stay()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, available_height: u16, tui: &TuiState) {
        let options = tui.session.options();
        let hints = [
            InputHint::new("↑↓", "select"),
            InputHint::new("1-9", "pick"),
            InputHint::new("Enter", "submit"),
        ];
        // question + site + blank + options + blank + notice + hints + borders
        let height = options.len() as u16 + 8;
        let layout = render_overlay(
            frame,
            area,
            available_height,
            &OverlayConfig {
                title: "Cookie consent",
                border_color: Color::Cyan,
                width: DIALOG_WIDTH,
                height,
                hints: &hints,
            },
        );

        let body_width = layout.body.width.saturating_sub(2) as usize;
        let site = tui.session.current_site().unwrap_or_default();

        let mut lines = vec![
            Line::from(Span::styled(
                "Which option did you choose on the cookie banner?",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                truncate_with_ellipsis(site, body_width),
                Style::default().fg(Color::DarkGray),
            )),
            Line::default(),
        ];

        for (i, option) in options.iter().enumerate() {
            let is_selected = self.selected == Some(i);
            let marker = if is_selected { "▶ " } else { "  " };
            let style = if is_selected {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Cyan)),
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(option.label.clone(), style),
            ]));
        }

        lines.push(Line::default());
        if let Some(notice) = &self.notice {
            lines.push(Line::from(Span::styled(
                notice.clone(),
                Style::default().fg(Color::Yellow),
            )));
        }

        let body = Rect::new(
            layout.body.x + 1,
            layout.body.y,
            layout.body.width.saturating_sub(2),
            layout.body.height,
        );
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), body);
    }
}
