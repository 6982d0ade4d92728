//! The controller's shell, bridged over its terminal channel.
//!
//! Output arrives as `TerminalOutput` actions and lands in a [`Scrollback`].
//! While focused, every key becomes the byte sequence a terminal would send
//! and goes out as `TerminalInput`. F5 reconnects; Shift+PageUp/PageDown
//! scroll.

use std::cell::Cell;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use benchdeck_core::{TerminalSize, TerminalStatus};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::scrollback::Scrollback;

/// Bytes a VT terminal sends for `key`, or `None` for keys the pane keeps.
pub fn key_to_input(key: KeyEvent) -> Option<String> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let seq = match key.code {
        KeyCode::Char(c) if ctrl => {
            let lower = c.to_ascii_lowercase();
            if !lower.is_ascii_lowercase() {
                return None;
            }
            let code = u32::from(lower) - u32::from('a') + 1;
            char::from_u32(code)?.to_string()
        }
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "\r".into(),
        KeyCode::Backspace => "\u{7f}".into(),
        KeyCode::Tab => "\t".into(),
        KeyCode::BackTab => "\u{1b}[Z".into(),
        KeyCode::Esc => "\u{1b}".into(),
        KeyCode::Up => "\u{1b}[A".into(),
        KeyCode::Down => "\u{1b}[B".into(),
        KeyCode::Right => "\u{1b}[C".into(),
        KeyCode::Left => "\u{1b}[D".into(),
        KeyCode::Home => "\u{1b}[H".into(),
        KeyCode::End => "\u{1b}[F".into(),
        KeyCode::Insert => "\u{1b}[2~".into(),
        KeyCode::Delete => "\u{1b}[3~".into(),
        KeyCode::PageUp => "\u{1b}[5~".into(),
        KeyCode::PageDown => "\u{1b}[6~".into(),
        _ => return None,
    };

    if alt {
        Some(format!("\u{1b}{seq}"))
    } else {
        Some(seq)
    }
}

pub struct TerminalPane {
    focused: bool,
    status: TerminalStatus,
    buffer: Scrollback,
    /// Lines scrolled up from the bottom.
    scroll: usize,
    /// Inner size at the last render, for resize announcements.
    inner_size: Cell<TerminalSize>,
}

impl Default for TerminalPane {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPane {
    pub fn new() -> Self {
        Self {
            focused: false,
            status: TerminalStatus::Disconnected,
            buffer: Scrollback::default(),
            scroll: 0,
            inner_size: Cell::new(TerminalSize::default()),
        }
    }

    /// Text area size as of the last render.
    pub fn inner_size(&self) -> TerminalSize {
        self.inner_size.get()
    }

    fn page(&self) -> usize {
        usize::from(self.inner_size.get().rows.max(1))
    }

    fn status_span(&self) -> Span<'static> {
        let style = match self.status {
            TerminalStatus::Connected => Style::default().fg(theme::SUCCESS_GREEN),
            TerminalStatus::Connecting => Style::default().fg(theme::ELECTRIC_YELLOW),
            TerminalStatus::Disconnected | TerminalStatus::Error(_) => {
                Style::default().fg(theme::ERROR_RED)
            }
        };
        Span::styled(format!(" {} ", self.status), style)
    }
}

impl Component for TerminalPane {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.kind == KeyEventKind::Release {
            return Ok(None);
        }

        match (key.modifiers, key.code) {
            (_, KeyCode::F(5)) => return Ok(Some(Action::TerminalReconnect)),
            (KeyModifiers::SHIFT, KeyCode::PageUp) => {
                let max = self.buffer.len().saturating_sub(self.page());
                self.scroll = (self.scroll + self.page()).min(max);
                return Ok(None);
            }
            (KeyModifiers::SHIFT, KeyCode::PageDown) => {
                self.scroll = self.scroll.saturating_sub(self.page());
                return Ok(None);
            }
            _ => {}
        }

        // Typing snaps back to the live line.
        self.scroll = 0;
        Ok(key_to_input(key).map(Action::TerminalInput))
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::TerminalOutput(text) => self.buffer.push(text),
            Action::TerminalStatusChanged(status) => self.status = status.clone(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(Line::from(vec![
                Span::styled(" Terminal ", theme::title_style()),
                self.status_span(),
            ]))
            .title_bottom(Line::from(vec![
                Span::styled(" F5 ", theme::key_hint_key()),
                Span::styled("reconnect ", theme::key_hint()),
                Span::styled(" F2 ", theme::key_hint_key()),
                Span::styled("panel ", theme::key_hint()),
            ]))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        self.inner_size
            .set(TerminalSize::new(inner.width.max(1), inner.height.max(1)));

        let lines: Vec<Line> = self
            .buffer
            .window(usize::from(inner.height), self.scroll)
            .into_iter()
            .map(|l| Line::from(Span::styled(l.to_owned(), theme::toggle_off())))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn focused(&self) -> bool {
        self.focused
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}
