//! Histogram overlay rendering.
//!
//! A legend of runs on the left, the overlay of the selected histogram on
//! the right. Each run is drawn as a step line with its error band.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::histogram::{format_scientific_tick, run_color};
use crate::data::{Overlay, PlotPoint, YScale};
use crate::ui::theme;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::horizontal([Constraint::Length(28), Constraint::Min(20)]).split(area);

    render_legend(frame, app, chunks[0]);

    match app.current_overlay() {
        Some(overlay) => render_chart(frame, app, overlay, chunks[1]),
        None => {
            let message = if app.plot_runs().is_empty() {
                "No histograms for this process"
            } else {
                "No runs selected (Space:toggle a:all)"
            };
            let block = Block::default()
                .title(" Plots ")
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border));
            let paragraph = Paragraph::new(message)
                .style(Style::default().add_modifier(Modifier::DIM))
                .block(block);
            frame.render_widget(paragraph, chunks[1]);
        }
    }
}

fn render_legend(frame: &mut Frame, app: &App, area: Rect) {
    let runs = app.plot_runs();
    let shown = app.shown_runs();
    let all_runs = app.monitor.cache().names();

    let items: Vec<ListItem> = runs
        .iter()
        .map(|run| {
            let checked = if shown.contains(run) { "[x]" } else { "[ ]" };
            let color = theme::run_color(run_color(all_runs, run));
            ListItem::new(Line::from(vec![
                Span::raw(format!("{} ", checked)),
                Span::styled("■ ", Style::default().fg(color)),
                Span::raw(run.clone()),
            ]))
        })
        .collect();

    let title = format!(" Runs ({}/{}) ", shown.len(), runs.len());
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    if !runs.is_empty() {
        state.select(Some(app.plot_run_index.min(runs.len() - 1)));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_chart(frame: &mut Frame, app: &App, overlay: &Overlay, area: Rect) {
    let scale = overlay.scale;

    // (style, points) per drawn line; datasets borrow these
    let mut lines: Vec<(Style, Vec<(f64, f64)>)> = Vec::new();
    for series in &overlay.series {
        let color = theme::run_color(series.color);
        let band = Style::default().fg(color).add_modifier(Modifier::DIM);
        for segment in step_segments(&series.points, |p| p.band_low, scale) {
            lines.push((band, segment));
        }
        for segment in step_segments(&series.points, |p| p.band_high, scale) {
            lines.push((band, segment));
        }
        for segment in step_segments(&series.points, |p| p.y, scale) {
            lines.push((Style::default().fg(color), segment));
        }
    }

    let datasets: Vec<Dataset> = lines
        .iter()
        .map(|(style, points)| {
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(*style)
                .data(points)
        })
        .collect();

    let x_bounds = [overlay.x_domain.0, overlay.x_domain.1];
    let y_bounds = y_bounds(overlay);

    let x_labels = axis_labels(x_bounds, linear_tick);
    let y_labels = match scale {
        YScale::Linear => axis_labels(y_bounds, linear_tick),
        YScale::Log => axis_labels(y_bounds, |v| format_scientific_tick(10f64.powf(v))),
    };

    let index = app.selected_histogram.min(app.overlays().len().saturating_sub(1));
    let title = format!(
        " {} ({}/{}) [{}] [L:scale []:histogram] ",
        overlay.name,
        index + 1,
        app.overlays().len(),
        scale.label()
    );

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(Span::styled(title, app.theme.header))
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .legend_position(None)
        .x_axis(Axis::default().bounds(x_bounds).labels(x_labels))
        .y_axis(Axis::default().bounds(y_bounds).labels(y_labels));

    frame.render_widget(chart, area);
}

/// Expand step points into drawable line segments.
///
/// Each point holds its value until the next point's x. Missing values
/// split the line; on a log scale values are drawn as `log10`.
fn step_segments(
    points: &[PlotPoint],
    value: impl Fn(&PlotPoint) -> Option<f64>,
    scale: YScale,
) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    for pair in points.windows(2) {
        let y = value(&pair[0]).map(|v| match scale {
            YScale::Linear => v,
            YScale::Log => v.log10(),
        });
        match y {
            Some(y) if y.is_finite() => {
                current.push((pair[0].x, y));
                current.push((pair[1].x, y));
            }
            _ => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn y_bounds(overlay: &Overlay) -> [f64; 2] {
    let Some((lo, hi)) = overlay.y_range() else {
        return [0.0, 1.0];
    };
    let (lo, hi) = match overlay.scale {
        YScale::Linear => (lo.min(0.0), hi),
        YScale::Log => (lo.log10(), hi.log10()),
    };
    if hi > lo {
        [lo, hi]
    } else {
        [lo - 0.5, hi + 0.5]
    }
}

fn axis_labels(bounds: [f64; 2], format: impl Fn(f64) -> String) -> Vec<Span<'static>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .into_iter()
        .map(|v| Span::raw(format(v)))
        .collect()
}

fn linear_tick(value: f64) -> String {
    let abs = value.abs();
    if value == 0.0 {
        "0".to_string()
    } else if (0.01..1e4).contains(&abs) {
        format!("{:.2}", value)
    } else {
        format_scientific_tick(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: Option<f64>) -> PlotPoint {
        PlotPoint {
            x,
            y,
            band_low: y,
            band_high: y,
        }
    }

    #[test]
    fn test_step_segments_hold_value() {
        let points = [point(0.0, Some(1.0)), point(1.0, Some(3.0)), point(2.0, Some(3.0))];
        let segments = step_segments(&points, |p| p.y, YScale::Linear);
        assert_eq!(
            segments,
            vec![vec![(0.0, 1.0), (1.0, 1.0), (1.0, 3.0), (2.0, 3.0)]]
        );
    }

    #[test]
    fn test_step_segments_split_at_gaps() {
        let points = [
            point(0.0, Some(10.0)),
            point(1.0, None),
            point(2.0, Some(100.0)),
            point(3.0, Some(100.0)),
        ];
        let segments = step_segments(&points, |p| p.y, YScale::Log);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], vec![(0.0, 1.0), (1.0, 1.0)]);
        assert_eq!(segments[1], vec![(2.0, 2.0), (3.0, 2.0)]);
    }

    #[test]
    fn test_linear_tick() {
        assert_eq!(linear_tick(0.0), "0");
        assert_eq!(linear_tick(2.5), "2.50");
        assert_eq!(linear_tick(25000.0), "2.5⋅10⁴");
    }
}
