//! Panel screen — bench cards, facility switches and the pressure gauge.
//!
//! Layout:
//! ┌─ header: connectivity, last poll ─────────────────────────────────┐
//! │ air pressure gauge                                                │
//! │ ┌─ Bench 1 ─┐ ┌─ Bench 2 ─┐ ┌─ Bench 3 ─┐ ┌─ Bench 4 ─┐           │
//! │ │ 5V / 12V / HV, rails master, service hold button      │           │
//! │ └───────────┘ └───────────┘ └───────────┘ └───────────┘           │
//! ├─ Facility: lights, air compressor, ALL OFF ───────────────────────┤
//!
//! The service button is a hold gesture. Mouse: press on the button, hold,
//! release; dragging off the button cancels. Keyboard: hold Space or
//! Enter on the button. Terminals that do not report key releases are
//! handled by treating a gap in key auto-repeat as the release.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use chrono::Utc;
use color_eyre::eyre::Result;
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, LineGauge, Paragraph};

use benchdeck_core::{
    BenchId, BenchView, Connectivity, HoldState, PanelView, PressureDisplay, Rail, Toggle,
};

use crate::action::{Action, ConfirmAction};
use crate::component::Component;
use crate::theme;

/// Longest pause between auto-repeated key presses that still counts as
/// a held key. Must stay below `MIN_HOLD_THRESHOLD`, or a tap would
/// outlast the threshold.
const REPEAT_GAP: Duration = Duration::from_millis(750);

/// Something on the panel that can be selected or clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Rail(BenchId, Rail),
    Master(BenchId),
    Service(BenchId),
    Facility(usize),
    AllOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Controls of one bench card, top to bottom.
fn card_rows(bench: BenchId) -> [Control; 5] {
    [
        Control::Rail(bench, Rail::V5),
        Control::Rail(bench, Rail::V12),
        Control::Rail(bench, Rail::Hv),
        Control::Master(bench),
        Control::Service(bench),
    ]
}

fn card_position(control: Control) -> Option<(usize, usize)> {
    let bench = match control {
        Control::Rail(b, _) | Control::Master(b) | Control::Service(b) => b,
        Control::Facility(_) | Control::AllOff => return None,
    };
    let col = usize::from(bench.number() - 1);
    let row = card_rows(bench).iter().position(|c| *c == control)?;
    Some((col, row))
}

/// Cursor movement over the card grid and the facility row below it.
///
/// The facility row holds `facility_count` switches followed by ALL OFF.
pub fn move_cursor(selected: Control, direction: Direction, facility_count: usize) -> Control {
    let bench_at = |col: usize| BenchId::ALL[col.min(BenchId::ALL.len() - 1)];
    let bottom = |idx: usize| {
        if idx >= facility_count {
            Control::AllOff
        } else {
            Control::Facility(idx)
        }
    };
    let bottom_index = |c: Control| match c {
        Control::Facility(i) => i,
        _ => facility_count,
    };

    if let Some((col, row)) = card_position(selected) {
        return match direction {
            Direction::Up => card_rows(bench_at(col))[row.saturating_sub(1)],
            Direction::Down if row + 1 < 5 => card_rows(bench_at(col))[row + 1],
            Direction::Down => bottom(col.min(facility_count)),
            Direction::Left => card_rows(bench_at(col.saturating_sub(1)))[row],
            Direction::Right => card_rows(bench_at(col + 1))[row],
        };
    }

    let idx = bottom_index(selected);
    match direction {
        Direction::Up => Control::Service(bench_at(idx)),
        Direction::Down => selected,
        Direction::Left => bottom(idx.saturating_sub(1)),
        Direction::Right => bottom((idx + 1).min(facility_count)),
    }
}

/// Action for activating (click / Space) a non-service control, if it is
/// currently enabled.
pub fn activate(view: &PanelView, control: Control) -> Option<Action> {
    match control {
        Control::Rail(bench, rail) => {
            let toggle = view.bench(bench)?.rail(rail);
            (!toggle.is_disabled()).then_some(Action::SetRail {
                bench,
                rail,
                on: !toggle.on,
            })
        }
        Control::Master(bench) => {
            let master = view.bench(bench)?.master;
            (!master.is_disabled()).then_some(Action::SetRailsMaster {
                bench,
                on: !master.on,
            })
        }
        Control::Facility(idx) => {
            let (channel, toggle) = view.facility.get(idx)?;
            (!toggle.is_disabled()).then(|| Action::SetFacility {
                channel: channel.clone(),
                on: !toggle.on,
            })
        }
        Control::AllOff => Some(Action::ShowConfirm(ConfirmAction::AllOff)),
        Control::Service(_) => None,
    }
}

/// A service hold driven by the keyboard.
#[derive(Debug, Clone, Copy)]
struct KeyHold {
    bench: BenchId,
    last_seen: Instant,
}

pub struct PanelScreen {
    focused: bool,
    view: PanelView,
    selected: Control,
    hold_threshold: Duration,
    /// Terminal reports key releases; otherwise auto-repeat gaps end holds.
    key_release: bool,
    key_hold: Option<KeyHold>,
    mouse_hold: Option<BenchId>,
    mouse_down: Option<Control>,
    /// When the current hold started, for the progress bar.
    hold_started: Option<(BenchId, Instant)>,
    /// Hit areas from the last render.
    hits: RefCell<Vec<(Rect, Control)>>,
}

impl PanelScreen {
    pub fn new(hold_threshold: Duration, key_release: bool) -> Self {
        Self {
            focused: true,
            view: PanelView::new(),
            selected: Control::Rail(BenchId::ALL[0], Rail::V5),
            hold_threshold,
            key_release,
            key_hold: None,
            mouse_hold: None,
            mouse_down: None,
            hold_started: None,
            hits: RefCell::new(Vec::new()),
        }
    }

    pub fn selected(&self) -> Control {
        self.selected
    }

    fn hit(&self, column: u16, row: u16) -> Option<Control> {
        let pos = Position::new(column, row);
        self.hits
            .borrow()
            .iter()
            .find(|(rect, _)| rect.contains(pos))
            .map(|(_, control)| *control)
    }

    fn begin_hold(&mut self, bench: BenchId) -> Action {
        self.hold_started = Some((bench, Instant::now()));
        Action::ServicePress(bench)
    }

    fn end_hold(&mut self, bench: BenchId, cancelled: bool) -> Action {
        self.hold_started = None;
        if cancelled {
            Action::ServiceLeave(bench)
        } else {
            Action::ServiceRelease(bench)
        }
    }

    /// Any key activity that is not the held key cancels a keyboard hold.
    fn cancel_key_hold(&mut self) -> Option<Action> {
        let hold = self.key_hold.take()?;
        Some(self.end_hold(hold.bench, true))
    }

    fn handle_hold_key(&mut self, bench: BenchId, kind: KeyEventKind) -> Option<Action> {
        let held = self.key_hold.is_some_and(|h| h.bench == bench);
        match kind {
            KeyEventKind::Release if held => {
                self.key_hold = None;
                Some(self.end_hold(bench, false))
            }
            KeyEventKind::Release | KeyEventKind::Repeat if !held => None,
            // Auto-repeat, sometimes reported as a press, keeps the hold alive.
            _ if held => {
                if let Some(hold) = self.key_hold.as_mut() {
                    hold.last_seen = Instant::now();
                }
                None
            }
            _ => {
                self.key_hold = Some(KeyHold {
                    bench,
                    last_seen: Instant::now(),
                });
                Some(self.begin_hold(bench))
            }
        }
    }

    /// Abandon any hold in progress, e.g. when focus moves to another pane.
    pub fn cancel_holds(&mut self) -> Option<Action> {
        if let Some(bench) = self.mouse_hold.take() {
            return Some(self.end_hold(bench, true));
        }
        self.cancel_key_hold()
    }

    fn hold_ratio(&self, card: &BenchView) -> Option<f64> {
        let HoldState::Holding { .. } = card.hold else {
            return None;
        };
        let (bench, started) = self.hold_started?;
        if bench != card.id {
            return None;
        }
        let elapsed = started.elapsed().as_secs_f64();
        Some((elapsed / self.hold_threshold.as_secs_f64()).clamp(0.0, 1.0))
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let (dot, style) = match &self.view.connectivity {
            Connectivity::Online { .. } => ("●", Style::default().fg(theme::SUCCESS_GREEN)),
            Connectivity::Offline { .. } => ("○", Style::default().fg(theme::ERROR_RED)),
            Connectivity::Unknown => ("◐", Style::default().fg(theme::ELECTRIC_YELLOW)),
        };

        let mut spans = vec![
            Span::styled(" benchdeck ", theme::title_style()),
            Span::styled(format!("{dot} {}", self.view.connectivity.label()), style),
        ];

        if let Some(last_ok) = self.view.connectivity.last_ok() {
            let age = (Utc::now() - last_ok).to_std().unwrap_or_default();
            let age = Duration::from_secs(age.as_secs());
            spans.push(Span::styled(
                format!("  last poll {} ago", humantime::format_duration(age)),
                theme::key_hint(),
            ));
        }
        if let Connectivity::Offline { error, .. } = &self.view.connectivity {
            spans.push(Span::styled(
                format!("  {error}"),
                Style::default().fg(theme::ERROR_RED),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_pressure(&self, frame: &mut Frame, area: Rect) {
        let label = format!(" Air {}", self.view.pressure);
        match self.view.pressure.ratio() {
            Some(ratio) => {
                let gauge = LineGauge::default()
                    .label(Span::styled(label, theme::title_style()))
                    .ratio(ratio)
                    .filled_style(Style::default().fg(theme::NEON_CYAN))
                    .unfilled_style(theme::key_hint());
                frame.render_widget(gauge, area);
            }
            None => {
                let style = match self.view.pressure {
                    PressureDisplay::Reading { .. } => theme::title_style(),
                    PressureDisplay::Unknown | PressureDisplay::Unavailable { .. } => {
                        theme::key_hint()
                    }
                };
                frame.render_widget(Paragraph::new(Span::styled(label, style)), area);
            }
        }
    }

    fn toggle_span(&self, toggle: Toggle, control: Control) -> Span<'static> {
        let (text, style) = if toggle.locked {
            ("[LOCK]", theme::toggle_disabled())
        } else if toggle.pending {
            ("[ .. ]", theme::toggle_disabled())
        } else if toggle.on {
            ("[ ON ]", theme::toggle_on())
        } else {
            ("[OFF ]", theme::toggle_off())
        };
        let style = if self.focused && self.selected == control {
            style.patch(theme::selected())
        } else {
            style
        };
        Span::styled(text, style)
    }

    fn service_line(&self, card: &BenchView, width: u16) -> Line<'static> {
        let control = Control::Service(card.id);
        let selected = self.focused && self.selected == control;

        let text = match card.hold {
            HoldState::Activating => " entering service… ",
            HoldState::Deactivating => " leaving service… ",
            HoldState::Holding { .. } => " hold… ",
            HoldState::Idle if card.service => " SERVICE ON (hold) ",
            HoldState::Idle => " hold for service ",
        };

        let base = if card.service {
            theme::service_active()
        } else {
            theme::toggle_off()
        };
        let base = if selected { base.patch(theme::selected()) } else { base };

        let Some(ratio) = self.hold_ratio(card) else {
            return Line::from(Span::styled(text, base));
        };

        // Fill the button text from the left as the hold progresses.
        let total = usize::from(width.max(1));
        let padded = format!("{text:<total$}");
        let filled = filled_cells(ratio, total);
        let split = padded
            .char_indices()
            .nth(filled)
            .map_or(padded.len(), |(i, _)| i);
        let (done, rest) = padded.split_at(split);
        Line::from(vec![
            Span::styled(done.to_owned(), theme::hold_progress().patch(theme::selected())),
            Span::styled(rest.to_owned(), base),
        ])
    }

    fn render_card(
        &self,
        frame: &mut Frame,
        area: Rect,
        card: &BenchView,
        hits: &mut Vec<(Rect, Control)>,
    ) {
        let selected_here = card_position(self.selected)
            .is_some_and(|(col, _)| col + 1 == usize::from(card.id.number()));
        let border = if card.service {
            theme::border_service()
        } else if self.focused && selected_here {
            theme::border_focused()
        } else {
            theme::border_default()
        };

        let block = Block::default()
            .title(format!(" {} ", card.label()))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::vertical([Constraint::Length(1); 5]).split(inner);

        for (i, rail) in Rail::POWER_UP.into_iter().enumerate() {
            let control = Control::Rail(card.id, rail);
            let line = Line::from(vec![
                Span::styled(format!(" {:<6}", rail.label()), theme::toggle_off()),
                self.toggle_span(card.rail(rail), control),
            ]);
            frame.render_widget(Paragraph::new(line), rows[i]);
            hits.push((rows[i], control));
        }

        let master = Control::Master(card.id);
        let line = Line::from(vec![
            Span::styled(format!(" {:<6}", "Rails"), theme::toggle_off()),
            self.toggle_span(card.master, master),
        ]);
        frame.render_widget(Paragraph::new(line), rows[3]);
        hits.push((rows[3], master));

        frame.render_widget(Paragraph::new(self.service_line(card, rows[4].width)), rows[4]);
        hits.push((rows[4], Control::Service(card.id)));
    }

    fn render_facility(&self, frame: &mut Frame, area: Rect, hits: &mut Vec<(Rect, Control)>) {
        let focused_here = self.focused && card_position(self.selected).is_none();
        let block = Block::default()
            .title(" Facility ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if focused_here {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let slots = self.view.facility.len() + 1;
        let ratio = Constraint::Ratio(1, u32::try_from(slots).unwrap_or(1));
        let cols = Layout::horizontal(vec![ratio; slots]).split(inner);

        for (idx, (name, toggle)) in self.view.facility.iter().enumerate() {
            let control = Control::Facility(idx);
            let line = Line::from(vec![
                Span::styled(format!(" {} ", facility_label(name)), theme::toggle_off()),
                self.toggle_span(*toggle, control),
            ]);
            frame.render_widget(Paragraph::new(line), cols[idx]);
            hits.push((cols[idx], control));
        }

        let all_off_style = if self.focused && self.selected == Control::AllOff {
            theme::danger().patch(theme::selected())
        } else {
            theme::danger()
        };
        let slot = cols[slots - 1];
        frame.render_widget(
            Paragraph::new(Span::styled(" [ ALL OFF ] ", all_off_style)),
            slot,
        );
        hits.push((slot, Control::AllOff));
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
fn filled_cells(ratio: f64, total: usize) -> usize {
    // `total` is a terminal width, far below f64's exact integer range.
    let cells = (ratio.clamp(0.0, 1.0) * total as f64).round() as usize;
    cells.min(total)
}

/// `air_compressor` → `Air compressor`.
pub fn facility_label(channel: &str) -> String {
    let spaced = channel.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Component for PanelScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let hold_key = matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter)
            && key.modifiers == KeyModifiers::NONE;

        if hold_key {
            if let Control::Service(bench) = self.selected {
                return Ok(self.handle_hold_key(bench, key.kind));
            }
        }

        if key.kind == KeyEventKind::Release {
            return Ok(None);
        }

        let direction = match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Direction::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Direction::Down),
            KeyCode::Left | KeyCode::Char('h') => Some(Direction::Left),
            KeyCode::Right | KeyCode::Char('l') => Some(Direction::Right),
            _ => None,
        };
        if let Some(direction) = direction {
            self.selected = move_cursor(self.selected, direction, self.view.facility.len());
            return Ok(self.cancel_key_hold());
        }

        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }

        let action = match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => activate(&self.view, self.selected),
            KeyCode::Char(c @ '1'..='4') => {
                let n = u8::try_from(u32::from(c) - u32::from('0')).unwrap_or(1);
                if let Some(bench) = BenchId::new(n) {
                    let row = card_position(self.selected).map_or(0, |(_, row)| row);
                    self.selected = card_rows(bench)[row];
                }
                None
            }
            KeyCode::Char('r') => Some(Action::RefreshNow),
            KeyCode::Char('X') => Some(Action::ShowConfirm(ConfirmAction::AllOff)),
            _ => None,
        };
        Ok(action)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        let target = self.hit(mouse.column, mouse.row);

        let action = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.mouse_down = target;
                if let Some(control) = target {
                    self.selected = control;
                }
                match target {
                    Some(Control::Service(bench)) => {
                        self.mouse_hold = Some(bench);
                        Some(self.begin_hold(bench))
                    }
                    _ => None,
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => match self.mouse_hold {
                Some(bench) if target != Some(Control::Service(bench)) => {
                    self.mouse_hold = None;
                    Some(self.end_hold(bench, true))
                }
                _ => None,
            },
            MouseEventKind::Up(MouseButton::Left) => {
                let down = self.mouse_down.take();
                if let Some(bench) = self.mouse_hold.take() {
                    Some(self.end_hold(bench, false))
                } else if down.is_some() && down == target {
                    down.and_then(|control| activate(&self.view, control))
                } else {
                    None
                }
            }
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::ViewUpdated(view) => {
                self.view = (**view).clone();
            }
            Action::Tick if !self.key_release => {
                if let Some(hold) = self.key_hold {
                    if hold.last_seen.elapsed() > REPEAT_GAP {
                        self.key_hold = None;
                        return Ok(Some(self.end_hold(hold.bench, false)));
                    }
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let mut hits = Vec::new();

        let layout = Layout::vertical([
            Constraint::Length(1), // header
            Constraint::Length(1), // pressure
            Constraint::Length(7), // bench cards
            Constraint::Length(3), // facility
            Constraint::Min(0),
        ])
        .split(area);

        self.render_header(frame, layout[0]);
        self.render_pressure(frame, layout[1]);

        let cards = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(layout[2]);
        for (card, slot) in self.view.benches.iter().zip(cards.iter()) {
            self.render_card(frame, *slot, card, &mut hits);
        }

        self.render_facility(frame, layout[3], &mut hits);

        *self.hits.borrow_mut() = hits;
    }

    fn focused(&self) -> bool {
        self.focused
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ratatui::{Terminal, backend::TestBackend};

    use benchdeck_core::DeviceState;
    use benchdeck_core::config::MIN_HOLD_THRESHOLD;

    use super::*;

    fn bench(n: u8) -> BenchId {
        BenchId::new(n).expect("valid bench")
    }

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn view_with(pairs: &[(&str, bool)]) -> PanelView {
        let state: DeviceState = pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect();
        let mut view = PanelView::new();
        view.apply_state(state);
        view
    }

    fn screen_with(view: PanelView) -> PanelScreen {
        let mut screen = PanelScreen::new(Duration::from_millis(1500), true);
        screen
            .update(&Action::ViewUpdated(Box::new(view)))
            .expect("update");
        screen
    }

    fn render(screen: &PanelScreen) {
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).expect("terminal");
        terminal
            .draw(|frame| screen.render(frame, frame.area()))
            .expect("draw");
    }

    fn position_of(screen: &PanelScreen, control: Control) -> (u16, u16) {
        let hits = screen.hits.borrow();
        let (rect, _) = hits
            .iter()
            .find(|(_, c)| *c == control)
            .expect("control rendered");
        (rect.x + 1, rect.y)
    }

    #[test]
    fn cursor_walks_cards_and_facility_row() {
        let start = Control::Rail(bench(1), Rail::V5);
        assert_eq!(move_cursor(start, Direction::Up, 2), start);
        assert_eq!(
            move_cursor(start, Direction::Right, 2),
            Control::Rail(bench(2), Rail::V5)
        );
        assert_eq!(
            move_cursor(Control::Rail(bench(4), Rail::Hv), Direction::Right, 2),
            Control::Rail(bench(4), Rail::Hv)
        );
        assert_eq!(
            move_cursor(Control::Master(bench(2)), Direction::Down, 2),
            Control::Service(bench(2))
        );
        assert_eq!(
            move_cursor(Control::Service(bench(1)), Direction::Down, 2),
            Control::Facility(0)
        );
        assert_eq!(
            move_cursor(Control::Service(bench(4)), Direction::Down, 2),
            Control::AllOff
        );
        assert_eq!(
            move_cursor(Control::Facility(1), Direction::Right, 2),
            Control::AllOff
        );
        assert_eq!(
            move_cursor(Control::AllOff, Direction::Right, 2),
            Control::AllOff
        );
        assert_eq!(
            move_cursor(Control::Facility(1), Direction::Up, 2),
            Control::Service(bench(2))
        );
    }

    #[test]
    fn activating_a_toggle_requests_the_opposite_state() {
        let view = view_with(&[("bench1_5v", true), ("lights", false)]);
        assert_eq!(
            activate(&view, Control::Rail(bench(1), Rail::V5)),
            Some(Action::SetRail {
                bench: bench(1),
                rail: Rail::V5,
                on: false
            })
        );
        assert_eq!(
            activate(&view, Control::Facility(0)),
            Some(Action::SetFacility {
                channel: "lights".into(),
                on: true
            })
        );
        assert_eq!(
            activate(&view, Control::AllOff),
            Some(Action::ShowConfirm(ConfirmAction::AllOff))
        );
        assert_eq!(activate(&view, Control::Service(bench(1))), None);
    }

    #[test]
    fn master_is_inert_while_in_service() {
        let view = view_with(&[("port2_vcc_en", true), ("bench2_5v", true)]);
        assert_eq!(activate(&view, Control::Master(bench(2))), None);

        let view = view_with(&[("bench2_5v", true), ("bench2_12v", true), ("bench2_hv", true)]);
        assert_eq!(
            activate(&view, Control::Master(bench(2))),
            Some(Action::SetRailsMaster {
                bench: bench(2),
                on: false
            })
        );
    }

    #[test]
    fn held_key_presses_then_releases_service() {
        let mut screen = screen_with(PanelView::new());
        screen.selected = Control::Service(bench(3));

        let press = screen
            .handle_key_event(key(KeyCode::Char(' '), KeyEventKind::Press))
            .expect("press");
        assert_eq!(press, Some(Action::ServicePress(bench(3))));

        let repeat = screen
            .handle_key_event(key(KeyCode::Char(' '), KeyEventKind::Repeat))
            .expect("repeat");
        assert_eq!(repeat, None);

        let release = screen
            .handle_key_event(key(KeyCode::Char(' '), KeyEventKind::Release))
            .expect("release");
        assert_eq!(release, Some(Action::ServiceRelease(bench(3))));
    }

    #[test]
    fn moving_away_mid_hold_cancels_it() {
        let mut screen = screen_with(PanelView::new());
        screen.selected = Control::Service(bench(1));
        screen
            .handle_key_event(key(KeyCode::Enter, KeyEventKind::Press))
            .expect("press");

        let moved = screen
            .handle_key_event(key(KeyCode::Up, KeyEventKind::Press))
            .expect("move");
        assert_eq!(moved, Some(Action::ServiceLeave(bench(1))));
        assert_eq!(screen.selected(), Control::Master(bench(1)));
    }

    #[test]
    fn repeat_gap_ends_hold_without_release_events() {
        let mut screen = PanelScreen::new(Duration::from_millis(1500), false);
        screen.selected = Control::Service(bench(2));
        screen
            .handle_key_event(key(KeyCode::Char(' '), KeyEventKind::Press))
            .expect("press");

        assert_eq!(screen.update(&Action::Tick).expect("tick"), None);

        screen.key_hold = screen.key_hold.map(|h| KeyHold {
            last_seen: Instant::now().checked_sub(REPEAT_GAP * 2).unwrap_or(h.last_seen),
            ..h
        });
        assert_eq!(
            screen.update(&Action::Tick).expect("tick"),
            Some(Action::ServiceRelease(bench(2)))
        );
    }

    #[test]
    fn mouse_hold_on_service_and_drag_off_cancels() {
        let mut screen = screen_with(PanelView::new());
        render(&screen);

        let (col, row) = position_of(&screen, Control::Service(bench(1)));
        let down = screen
            .handle_mouse_event(mouse(MouseEventKind::Down(MouseButton::Left), col, row))
            .expect("down");
        assert_eq!(down, Some(Action::ServicePress(bench(1))));

        let (mcol, mrow) = position_of(&screen, Control::Master(bench(1)));
        let drag = screen
            .handle_mouse_event(mouse(MouseEventKind::Drag(MouseButton::Left), mcol, mrow))
            .expect("drag");
        assert_eq!(drag, Some(Action::ServiceLeave(bench(1))));

        let up = screen
            .handle_mouse_event(mouse(MouseEventKind::Up(MouseButton::Left), mcol, mrow))
            .expect("up");
        assert_eq!(up, None);
    }

    #[test]
    fn click_on_rail_toggles_it() {
        let mut screen = screen_with(view_with(&[("bench4_hv", false)]));
        render(&screen);

        let (col, row) = position_of(&screen, Control::Rail(bench(4), Rail::Hv));
        screen
            .handle_mouse_event(mouse(MouseEventKind::Down(MouseButton::Left), col, row))
            .expect("down");
        let up = screen
            .handle_mouse_event(mouse(MouseEventKind::Up(MouseButton::Left), col, row))
            .expect("up");
        assert_eq!(
            up,
            Some(Action::SetRail {
                bench: bench(4),
                rail: Rail::Hv,
                on: true
            })
        );
    }

    #[test]
    fn facility_labels_are_readable() {
        assert_eq!(facility_label("air_compressor"), "Air compressor");
        assert_eq!(facility_label("lights"), "Lights");
    }

    #[test]
    fn tap_without_release_events_ends_before_shortest_hold() {
        assert!(REPEAT_GAP < MIN_HOLD_THRESHOLD);

        let mut screen = PanelScreen::new(MIN_HOLD_THRESHOLD, false);
        screen.selected = Control::Service(bench(3));
        let press = screen
            .handle_key_event(key(KeyCode::Char(' '), KeyEventKind::Press))
            .expect("press");
        assert_eq!(press, Some(Action::ServicePress(bench(3))));

        // No repeats arrive: the inferred release comes one gap after the tap.
        let tapped = Instant::now()
            .checked_sub(REPEAT_GAP + Duration::from_millis(10))
            .expect("clock");
        screen.key_hold = screen.key_hold.map(|h| KeyHold {
            last_seen: tapped,
            ..h
        });
        let held_for = tapped.elapsed();
        assert_eq!(
            screen.update(&Action::Tick).expect("tick"),
            Some(Action::ServiceRelease(bench(3)))
        );
        assert!(held_for < MIN_HOLD_THRESHOLD);
    }
}
