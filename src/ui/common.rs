//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::data::duration::format_duration;
use crate::source::RunStatus;

/// Render the header bar with the monitored process and run counts.
///
/// Displays: monitor phase, process name, runs by status.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let phase = app.monitor.phase();

    let mut spans = vec![
        Span::styled(" ● ", app.theme.phase_style(phase)),
        Span::styled("MADBOARD ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
    ];

    let Some(process) = app.monitor.process() else {
        let catalog = if app.catalog.is_loading() {
            "Loading processes...".to_string()
        } else {
            format!("{} processes", app.catalog.processes().len())
        };
        spans.push(Span::raw(catalog));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
        return;
    };

    spans.push(Span::styled(
        process.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw(" │ "));
    spans.push(Span::styled(phase.label().to_string(), app.theme.phase_style(phase)));
    spans.push(Span::raw(" │ "));

    let cache = app.monitor.cache();
    spans.push(Span::styled(
        format!("{}", cache.len()),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw(" runs"));

    for (label, count) in cache.status_counts() {
        let style = app.theme.run_status_style(&RunStatus::from(label.clone()));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!("{}", count), style));
        spans.push(Span::raw(format!(" {}", label)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = View::ALL
        .iter()
        .map(|view| Line::from(format!(" {}:{} ", view.index() + 1, view.label())))
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.current_view.index())
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows: breadcrumb trail, time since last update, available controls.
/// A pending confirmation or a temporary status message replaces it.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(ref pending) = app.pending_delete {
        let paragraph = Paragraph::new(format!(" {} ", pending.prompt()))
            .style(Style::default().fg(app.theme.critical).add_modifier(Modifier::BOLD));
        frame.render_widget(paragraph, area);
        return;
    }

    // Check for temporary status message first
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = if app.filter_active {
        "Type to search | Enter:apply Esc:cancel"
    } else {
        match app.current_view {
            View::Processes => "/:search Enter:open r:reload X:delete ?:help q:quit",
            View::Runs => "/:search Enter:open r:refresh d:delete e:export ?:help q:quit",
            View::Run => "Tab:switch r:refresh d:delete e:export ?:help q:quit",
            View::Plots => "Space:toggle a/A:all/none [/]:histogram L:log ?:help q:quit",
        }
    };

    let mut parts = vec![app.breadcrumb()];
    if let Some(updated) = app.monitor.cache().updated_at() {
        parts.push(format!("Updated {} ago", format_duration(updated.elapsed())));
    }
    if let Some(err) = app.monitor.last_error().or(app.catalog.error()) {
        parts.push(format!("Error: {}", err));
    }
    parts.push(controls.to_string());

    let paragraph = Paragraph::new(format!(" {}", parts.join(" | ")))
        .style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(title, Style::default().add_modifier(Modifier::BOLD))])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ←/→ h/l     Switch views"),
        Line::from("  1-4         Jump to view"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Enter       Open process/run"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        section(" Lists"),
        Line::from("  /           Start filter/search"),
        Line::from("  c           Clear filter"),
        Line::from("  d           Delete run"),
        Line::from("  X           Delete process"),
        Line::from(""),
        section(" Plots"),
        Line::from("  Space       Toggle run in overlay"),
        Line::from("  a / A       Show all / no runs"),
        Line::from("  [ / ]       Previous/next histogram"),
        Line::from("  L           Toggle log scale"),
        Line::from(""),
        section(" General"),
        Line::from("  r           Refresh"),
        Line::from("  e           Export to JSON"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 32u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
