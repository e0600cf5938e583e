//! Process list rendering.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;

/// Render the table of processes known to the service.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let processes = app.visible_processes();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if app.catalog.processes().is_empty() {
        let message = if app.catalog.is_loading() {
            "Loading processes...".to_string()
        } else if let Some(err) = app.catalog.error() {
            format!("Failed to load processes: {}\n\nPress r to retry", err)
        } else {
            "No processes".to_string()
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block.title(" Processes "));
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec![Cell::from("Process"), Cell::from("Runs")])
        .height(1)
        .style(app.theme.header);

    let current = app.monitor.process();
    let rows: Vec<Row> = processes
        .iter()
        .map(|p| {
            let name_style = if current == Some(p.name.as_str()) {
                Style::default().fg(app.theme.highlight).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(p.name.clone()).style(name_style),
                Cell::from(p.runs.len().to_string()),
            ])
        })
        .collect();

    let widths = [Constraint::Fill(4), Constraint::Min(6)];

    let selected = app.selected_process_index.min(processes.len().saturating_sub(1));

    let position_info = if !processes.is_empty() {
        format!(" [{}/{}]", selected + 1, processes.len())
    } else {
        String::new()
    };

    let title = format!(
        " Processes ({}/{}){}{} ",
        processes.len(),
        app.catalog.processes().len(),
        super::filter_info(app),
        position_info
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block.title(title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}
