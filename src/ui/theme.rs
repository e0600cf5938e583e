//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::histogram::Rgb;
use crate::monitor::Phase;
use crate::source::RunStatus;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for runs that are queued or still integrating.
    pub active: Color,
    /// Color for failures.
    pub critical: Color,
    /// Color for finished runs.
    pub done: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Style for the active tab.
    pub tab_active: Style,
    /// Style for inactive tabs.
    pub tab_inactive: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            active: Color::Yellow,
            critical: Color::Red,
            done: Color::Green,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            active: Color::Yellow,
            critical: Color::Red,
            done: Color::Green,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a run status
    pub fn run_status_style(&self, status: &RunStatus) -> Style {
        match status {
            RunStatus::Done => Style::default().fg(self.done),
            RunStatus::Running => Style::default().fg(self.active).add_modifier(Modifier::BOLD),
            RunStatus::Pending => Style::default().fg(self.active),
            RunStatus::Unknown | RunStatus::Other(_) => {
                Style::default().add_modifier(Modifier::DIM)
            }
        }
    }

    /// Get style for the monitor phase shown in the header
    pub fn phase_style(&self, phase: &Phase) -> Style {
        match phase {
            Phase::Idle => Style::default().add_modifier(Modifier::DIM),
            Phase::Fetching => Style::default().fg(self.active),
            Phase::Live => Style::default().fg(self.done),
            Phase::Failed(_) => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
        }
    }
}

/// Terminal color of a run's plot color.
pub fn run_color(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}
