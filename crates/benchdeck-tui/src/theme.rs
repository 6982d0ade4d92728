//! Panel palette and semantic styling.

use ratatui::style::{Color, Modifier, Style};

// ── Core Palette ──────────────────────────────────────────────────────

pub const ELECTRIC_PURPLE: Color = Color::Rgb(225, 53, 255); // #e135ff
pub const NEON_CYAN: Color = Color::Rgb(128, 255, 234); // #80ffea
pub const CORAL: Color = Color::Rgb(255, 106, 193); // #ff6ac1
pub const ELECTRIC_YELLOW: Color = Color::Rgb(241, 250, 140); // #f1fa8c
pub const SUCCESS_GREEN: Color = Color::Rgb(80, 250, 123); // #50fa7b
pub const ERROR_RED: Color = Color::Rgb(255, 99, 99); // #ff6363

// ── Extended Palette ──────────────────────────────────────────────────

pub const DIM_WHITE: Color = Color::Rgb(189, 193, 207); // #bdc1cf
pub const BORDER_GRAY: Color = Color::Rgb(98, 114, 164); // #6272a4
pub const BG_HIGHLIGHT: Color = Color::Rgb(40, 42, 54); // #282a36
pub const BG_DARK: Color = Color::Rgb(30, 31, 41); // #1e1f29

// ── Semantic Styles ───────────────────────────────────────────────────

/// Title text for blocks/panels.
pub fn title_style() -> Style {
    Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)
}

pub fn border_focused() -> Style {
    Style::default().fg(ELECTRIC_PURPLE)
}

pub fn border_default() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Bench card border while the bench is in service mode.
pub fn border_service() -> Style {
    Style::default().fg(ELECTRIC_YELLOW)
}

/// A toggle that is on.
pub fn toggle_on() -> Style {
    Style::default()
        .fg(SUCCESS_GREEN)
        .add_modifier(Modifier::BOLD)
}

pub fn toggle_off() -> Style {
    Style::default().fg(DIM_WHITE)
}

/// Pending or locked toggles.
pub fn toggle_disabled() -> Style {
    Style::default()
        .fg(BORDER_GRAY)
        .add_modifier(Modifier::DIM)
}

/// Cursor on the selected control.
pub fn selected() -> Style {
    Style::default()
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::REVERSED)
}

/// Service button while the bench is in service mode.
pub fn service_active() -> Style {
    Style::default()
        .fg(BG_DARK)
        .bg(ELECTRIC_YELLOW)
        .add_modifier(Modifier::BOLD)
}

/// Filled part of the hold progress bar.
pub fn hold_progress() -> Style {
    Style::default().fg(CORAL)
}

pub fn danger() -> Style {
    Style::default().fg(ERROR_RED).add_modifier(Modifier::BOLD)
}

/// Key hint text (e.g., "q quit  ? help").
pub fn key_hint() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Key hint key character.
pub fn key_hint_key() -> Style {
    Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)
}
