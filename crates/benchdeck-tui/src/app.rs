//! Application core — event loop, focus, action dispatch.

use std::cell::Cell;
use std::future::Future;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use benchdeck_core::{
    BenchClient, Confirmed, CoreError, DeviceState, Panel, StatusLevel, StatusLine,
    TerminalBridge, TerminalSize,
};

use crate::action::{Action, ConfirmAction, Focus};
use crate::component::Component;
use crate::data_bridge::{TerminalFeed, spawn_data_bridge};
use crate::event::{Event, EventReader};
use crate::screens::panel::PanelScreen;
use crate::theme;
use crate::tui::Tui;
use crate::widgets::terminal_pane::TerminalPane;

/// Rows the panel screen needs: header, gauge, cards, facility row.
const PANEL_HEIGHT: u16 = 12;

/// How long an error status stays up as a toast.
const TOAST_TTL: Duration = Duration::from_secs(4);

pub struct App {
    panel: Panel<BenchClient>,
    panel_screen: PanelScreen,
    terminal_pane: TerminalPane,
    /// `None` when the terminal pane is disabled.
    terminal: Option<TerminalBridge>,
    focus: Focus,
    running: bool,
    help_visible: bool,
    pending_confirm: Option<ConfirmAction>,
    status: StatusLine,
    /// When the current status line arrived.
    status_since: Instant,
    /// Terminal pane area from the last render, for click-to-focus.
    terminal_area: Cell<Rect>,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    data_cancel: CancellationToken,
}

impl App {
    pub fn new(panel: Panel<BenchClient>) -> Result<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let data_cancel = CancellationToken::new();

        let config = panel.config();
        let terminal = if config.terminal_enabled {
            Some(TerminalBridge::new(
                &config.url,
                TerminalSize::default(),
                &data_cancel,
            )?)
        } else {
            None
        };

        Ok(Self {
            panel_screen: PanelScreen::new(config.hold_threshold, false),
            panel,
            terminal_pane: TerminalPane::new(),
            terminal,
            focus: Focus::Panel,
            running: true,
            help_visible: false,
            pending_confirm: None,
            status: StatusLine::default(),
            status_since: Instant::now(),
            terminal_area: Cell::new(Rect::default()),
            action_tx,
            action_rx,
            data_cancel,
        })
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.panel_screen =
            PanelScreen::new(self.panel.config().hold_threshold, tui.key_release());

        let feed = self.terminal.as_ref().map(|bridge| TerminalFeed {
            status: bridge.subscribe_status(),
            output: bridge.subscribe_output(),
        });
        let bridge_task: JoinHandle<()> = tokio::spawn(spawn_data_bridge(
            self.panel.clone(),
            feed,
            self.action_tx.clone(),
            self.data_cancel.clone(),
        ));

        // Draw once so the terminal pane knows its size before announcing it.
        tui.draw(|frame| self.render(frame))?;
        self.sync_terminal_size();
        if let Some(bridge) = self.terminal.as_mut() {
            bridge.open();
        }

        let mut events = EventReader::new(
            Duration::from_millis(100), // 10 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(action) = self.handle_mouse_event(mouse)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Paste(text) => {
                    if self.focus == Focus::Terminal {
                        self.action_tx.send(Action::TerminalInput(text))?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                    self.sync_terminal_size();
                }
            }
        }

        // Stop polling, close the terminal channel, restore the terminal.
        self.data_cancel.cancel();
        events.stop();
        if let Some(bridge) = self.terminal.as_mut() {
            bridge.close();
        }
        let _ = bridge_task.await;
        info!("TUI event loop ended");
        Ok(())
    }

    fn sync_terminal_size(&mut self) {
        let size = self.terminal_pane.inner_size();
        if let Some(bridge) = self.terminal.as_mut() {
            if bridge.size() != size {
                // Disconnected: the size is kept for the next open.
                if let Err(e) = bridge.resize(size) {
                    debug!(error = %e, "terminal resize not announced");
                }
            }
        }
    }

    // ── Input ────────────────────────────────────────────────────────

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let press = key.kind == KeyEventKind::Press;

        if self.pending_confirm.is_some() {
            return Ok(match key.code {
                KeyCode::Char('y' | 'Y') if press => Some(Action::ConfirmYes),
                KeyCode::Char('n' | 'N') | KeyCode::Esc if press => Some(Action::ConfirmNo),
                _ => None,
            });
        }

        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') if press => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        if press {
            match (key.modifiers, key.code) {
                (KeyModifiers::CONTROL, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
                (_, KeyCode::F(2)) if self.terminal.is_some() => {
                    return Ok(Some(Action::FocusNext));
                }
                _ => {}
            }
        }

        if self.focus == Focus::Terminal {
            return self.terminal_pane.handle_key_event(key);
        }

        if press {
            match (key.modifiers, key.code) {
                (KeyModifiers::CONTROL, KeyCode::Char('c'))
                | (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
                (_, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),
                (KeyModifiers::NONE, KeyCode::Tab) if self.terminal.is_some() => {
                    return Ok(Some(Action::FocusNext));
                }
                _ => {}
            }
        }

        self.panel_screen.handle_key_event(key)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if self.pending_confirm.is_some() || self.help_visible {
            return Ok(None);
        }

        let in_terminal = self.terminal.is_some()
            && self
                .terminal_area
                .get()
                .contains(Position::new(mouse.column, mouse.row));

        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            let wanted = if in_terminal {
                Focus::Terminal
            } else {
                Focus::Panel
            };
            if wanted != self.focus {
                self.action_tx.send(Action::FocusNext)?;
            }
        }

        if in_terminal {
            return Ok(None);
        }
        self.panel_screen.handle_mouse_event(mouse)
    }

    // ── Actions ──────────────────────────────────────────────────────

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::Render | Action::Resize(..) => {}

            Action::Tick | Action::ViewUpdated(_) => {
                if let Some(follow_up) = self.panel_screen.update(action)? {
                    self.action_tx.send(follow_up)?;
                }
            }

            Action::FocusNext => {
                let next = match self.focus {
                    Focus::Panel => Focus::Terminal,
                    Focus::Terminal => Focus::Panel,
                };
                if next == Focus::Terminal {
                    if let Some(cancel) = self.panel_screen.cancel_holds() {
                        self.action_tx.send(cancel)?;
                    }
                }
                self.focus = next;
                self.panel_screen.set_focused(next == Focus::Panel);
                self.terminal_pane.set_focused(next == Focus::Terminal);
            }

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::StatusUpdated(line) => {
                self.status = line.clone();
                self.status_since = Instant::now();
            }

            Action::TerminalStatusChanged(_) | Action::TerminalOutput(_) => {
                self.terminal_pane.update(action)?;
            }

            // ── Panel commands ──
            Action::SetRail { bench, rail, on } => {
                let (panel, bench, rail, on) = (self.panel.clone(), *bench, *rail, *on);
                spawn_command("set rail", async move { panel.set_rail(bench, rail, on).await });
            }
            Action::SetRailsMaster { bench, on } => {
                let (panel, bench, on) = (self.panel.clone(), *bench, *on);
                spawn_command("rails master", async move {
                    panel.set_rails_master(bench, on).await
                });
            }
            Action::SetFacility { channel, on } => {
                let (panel, channel, on) = (self.panel.clone(), channel.clone(), *on);
                spawn_command("set channel", async move { panel.set_channel(&channel, on).await });
            }
            Action::ServicePress(bench) => self.panel.press_service(*bench),
            Action::ServiceRelease(bench) => self.panel.release_service(*bench),
            Action::ServiceLeave(bench) => self.panel.leave_service(*bench),
            Action::RefreshNow => {
                let panel = self.panel.clone();
                tokio::spawn(async move {
                    panel.refresh_pressure().await;
                    if let Err(e) = panel.poll_once().await {
                        panel.report(StatusLine::failed("refresh", &e));
                    }
                });
            }

            // ── Confirmation ──
            Action::ShowConfirm(confirm) => self.pending_confirm = Some(confirm.clone()),
            Action::ConfirmYes => {
                if let Some(ConfirmAction::AllOff) = self.pending_confirm.take() {
                    let panel = self.panel.clone();
                    spawn_command("all off", async move {
                        panel.all_off(Confirmed::by_operator()).await
                    });
                }
            }
            Action::ConfirmNo => self.pending_confirm = None,

            // ── Terminal ──
            Action::TerminalInput(text) => {
                if let Some(bridge) = self.terminal.as_ref() {
                    // Not connected: keystrokes are dropped, never queued.
                    if let Err(e) = bridge.send_keys(text) {
                        debug!(error = %e, "terminal input dropped");
                    }
                }
            }
            Action::TerminalReconnect => {
                if let Some(bridge) = self.terminal.as_mut() {
                    self.panel.report(StatusLine::info("Reconnecting terminal"));
                    bridge.reconnect();
                }
            }
        }

        Ok(())
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let (content, status_area) = {
            let rows = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(area);
            (rows[0], rows[1])
        };

        if self.terminal.is_some() {
            let rows = Layout::vertical([Constraint::Length(PANEL_HEIGHT), Constraint::Min(3)])
                .split(content);
            self.panel_screen.render(frame, rows[0]);
            self.terminal_pane.render(frame, rows[1]);
            self.terminal_area.set(rows[1]);
        } else {
            self.panel_screen.render(frame, content);
        }

        self.render_status_bar(frame, status_area);

        if self.status.level == StatusLevel::Error && self.status_since.elapsed() < TOAST_TTL {
            render_toast(frame, area, &self.status);
        }
        if let Some(ref confirm) = self.pending_confirm {
            render_confirm_dialog(frame, area, confirm);
        }
        if self.help_visible {
            render_help_overlay(frame, area);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let (icon, color) = status_icon(self.status.level);
        let at = self
            .status
            .at
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S");

        let mut spans = vec![
            Span::styled(format!(" {icon} "), Style::default().fg(color)),
            Span::styled(format!("{at} "), theme::key_hint()),
            Span::styled(self.status.message.clone(), Style::default().fg(color)),
            Span::styled("  │ ? help  ", theme::key_hint()),
        ];
        if self.terminal.is_some() {
            spans.push(Span::styled("F2 focus  ", theme::key_hint()));
        }
        spans.push(Span::styled("q quit", theme::key_hint()));

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

/// Run a panel write in the background. The panel reports failures on the
/// status line itself; here they are only logged.
fn spawn_command<F>(label: &'static str, command: F)
where
    F: Future<Output = Result<DeviceState, CoreError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = command.await {
            debug!(command = label, error = %e, "command failed");
        }
    });
}

fn status_icon(level: StatusLevel) -> (&'static str, ratatui::style::Color) {
    match level {
        StatusLevel::Info => ("·", theme::NEON_CYAN),
        StatusLevel::Success => ("✓", theme::SUCCESS_GREEN),
        StatusLevel::Error => ("✗", theme::ERROR_RED),
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_toast(frame: &mut Frame, area: Rect, line: &StatusLine) {
    let msg_len = u16::try_from(line.message.chars().count()).unwrap_or(u16::MAX);
    let width = msg_len.saturating_add(6).clamp(20, 70).min(area.width);
    let height = 3u16;

    let x = area.width.saturating_sub(width + 1);
    let y = area.height.saturating_sub(height + 1); // above status bar
    let toast_area = Rect::new(area.x + x, area.y + y, width, height);
    let (icon, color) = status_icon(line.level);

    frame.render_widget(Clear, toast_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(theme::BG_DARK));
    let inner = block.inner(toast_area);
    frame.render_widget(block, toast_area);

    let text = Line::from(vec![
        Span::styled(format!(" {icon} "), Style::default().fg(color)),
        Span::styled(line.message.clone(), Style::default().fg(theme::DIM_WHITE)),
    ]);
    frame.render_widget(Paragraph::new(text), inner);
}

fn render_confirm_dialog(frame: &mut Frame, area: Rect, confirm: &ConfirmAction) {
    let dialog_area = centered(area, 56, 5);

    frame.render_widget(Clear, dialog_area);
    let block = Block::default()
        .title(" Confirm ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::ELECTRIC_YELLOW))
        .style(Style::default().bg(theme::BG_DARK));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let text = vec![
        Line::from(Span::styled(
            format!("  {confirm}"),
            Style::default().fg(theme::DIM_WHITE),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  y ", theme::key_hint_key()),
            Span::styled("confirm    ", theme::key_hint()),
            Span::styled("n ", theme::key_hint_key()),
            Span::styled("cancel", theme::key_hint()),
        ]),
    ];
    frame.render_widget(Paragraph::new(text), inner);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_area = centered(area, 60, 19);

    frame.render_widget(Clear, help_area);
    let block = Block::default()
        .title(" Keys ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
        .style(Style::default().bg(theme::BG_DARK));
    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let entry = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {keys:<14}"), theme::key_hint_key()),
            Span::styled(what, theme::key_hint()),
        ])
    };
    let heading = |text: &'static str| {
        Line::from(Span::styled(
            format!("  {text}"),
            Style::default().fg(theme::NEON_CYAN),
        ))
    };

    let lines = vec![
        Line::from(""),
        heading("Panel"),
        entry("←↓↑→ / hjkl", "Move between controls"),
        entry("1-4", "Jump to bench"),
        entry("Space / Enter", "Toggle the selected switch"),
        entry("hold Space", "Enter / leave service mode"),
        entry("X", "All off (asks first)"),
        entry("r", "Refresh now"),
        Line::from(""),
        heading("Mouse"),
        entry("click", "Toggle a switch"),
        entry("press + hold", "Service button; drag off to cancel"),
        Line::from(""),
        heading("Global"),
        entry("F2 / Tab", "Focus panel / terminal"),
        entry("F5", "Reconnect terminal (terminal focus)"),
        entry("q / Ctrl+Q", "Quit"),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}
