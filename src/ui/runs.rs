//! Run overview rendering.
//!
//! One row per run of the selected process with its total cross section,
//! unweighted event count and status.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::RunRow;
use crate::monitor::Phase;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let empty_message = match app.monitor.phase() {
        Phase::Idle => Some("Select a process first (1:Processes, Enter)".to_string()),
        Phase::Fetching => Some("Loading runs...".to_string()),
        Phase::Failed(err) => Some(format!("Failed to load runs: {}\n\nPress r to retry", err)),
        Phase::Live if app.monitor.cache().is_empty() => Some("No runs".to_string()),
        Phase::Live => None,
    };
    if let Some(message) = empty_message {
        let paragraph = Paragraph::new(message)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block.title(" Runs "));
        frame.render_widget(paragraph, area);
        return;
    }

    let runs = app.visible_runs();

    let header = Row::new(vec![
        Cell::from("Run"),
        Cell::from("Cross section"),
        Cell::from("Unweighted"),
        Cell::from("Status"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = runs
        .iter()
        .map(|run| {
            let row = RunRow::from_run(run);
            let name_style = if app.selected_run.as_deref() == Some(run.name.as_str()) {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(row.run).style(name_style),
                Cell::from(row.cross_section),
                Cell::from(row.unweighted_events),
                Cell::from(row.status).style(app.theme.run_status_style(&run.status)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Fill(2),
        Constraint::Fill(1),
        Constraint::Min(8),
    ];

    let selected = app.selected_run_index.min(runs.len().saturating_sub(1));

    let position_info = if !runs.is_empty() {
        format!(" [{}/{}]", selected + 1, runs.len())
    } else {
        String::new()
    };

    let title = format!(
        " Runs ({}/{}){}{} ",
        runs.len(),
        app.monitor.cache().len(),
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
