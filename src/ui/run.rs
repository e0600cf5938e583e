//! Run detail rendering.
//!
//! Shows the subprocess aggregates, the per-channel statistics and the
//! output files of the selected run.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::data::StatsRow;

const COLUMNS: [&str; 8] = [
    "Name",
    "Cross section",
    "Samples",
    "After cuts",
    "Unweighted",
    "RSD",
    "Eff. before",
    "Eff. after",
];

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let (Some(run), Some(summary)) = (app.selected_run_data(), app.summary()) else {
        let block = Block::default()
            .title(" Run ")
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border));
        let paragraph = Paragraph::new("Select a run first (2:Runs, Enter)")
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let subprocess_rows = summary.subprocess_rows();
    let channel_rows = summary.channel_rows();

    // subprocess table sized to its rows, files get a fixed strip
    let chunks = Layout::vertical([
        Constraint::Length(subprocess_rows.len() as u16 + 3),
        Constraint::Min(5),
        Constraint::Length(4),
    ])
    .split(area);

    let subprocess_title = format!(
        " Subprocesses of {} [{}] ({}) ",
        run.name,
        run.status,
        subprocess_rows.len()
    );
    render_stats_table(frame, app, chunks[0], subprocess_title, &subprocess_rows);

    let channel_title = format!(" Channels ({}) ", channel_rows.len());
    render_stats_table(frame, app, chunks[1], channel_title, &channel_rows);

    let files: Vec<Span> = if run.files.is_empty() {
        vec![Span::styled("no files", Style::default().add_modifier(Modifier::DIM))]
    } else {
        run.files
            .iter()
            .flat_map(|f| [Span::raw(f.clone()), Span::raw("  ")])
            .collect()
    };
    let files_block = Block::default()
        .title(" Files ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    frame.render_widget(Paragraph::new(Line::from(files)).block(files_block), chunks[2]);
}

fn render_stats_table(frame: &mut Frame, app: &App, area: Rect, title: String, rows: &[StatsRow]) {
    let header = Row::new(COLUMNS.iter().map(|c| Cell::from(*c)))
        .height(1)
        .style(app.theme.header);

    let rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.name.clone()),
                Cell::from(r.cross_section.clone()),
                Cell::from(r.samples_before_cuts.clone()),
                Cell::from(r.samples_after_cuts.clone()),
                Cell::from(r.unweighted_events.clone()),
                Cell::from(r.relative_std_dev.clone()),
                Cell::from(r.efficiency_before_cuts.clone()),
                Cell::from(r.efficiency_after_cuts.clone()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Fill(1),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border)),
    );

    frame.render_widget(table, area);
}
