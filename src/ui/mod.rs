//! Terminal UI rendering using ratatui.
//!
//! Each view is implemented in its own submodule with a `render` function.
//!
//! ## Submodules
//!
//! - [`processes`]: Table of all processes known to the service
//! - [`runs`]: Run overview of the selected process
//! - [`run`]: Subprocess and channel statistics of the selected run
//! - [`plots`]: Histogram overlays with a run legend
//! - [`common`]: Shared components (header, tabs, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │ Tabs (common::render_tabs)           │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ View Content                         │
//! │ (processes/runs/run/plots::render)   │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlay rendered on top:
//!    - common::render_help
//! ```

pub mod common;
pub mod plots;
pub mod processes;
pub mod run;
pub mod runs;
pub mod theme;

pub use theme::Theme;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    Frame,
};

use crate::app::{App, View};

/// Render one frame: header, tabs, current view, status bar and overlays.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Length(1), // Tabs
        Constraint::Min(8),    // Content
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    common::render_header(frame, app, chunks[0]);
    common::render_tabs(frame, app, chunks[1]);

    match app.current_view {
        View::Processes => processes::render(frame, app, chunks[2]),
        View::Runs => runs::render(frame, app, chunks[2]),
        View::Run => run::render(frame, app, chunks[2]),
        View::Plots => plots::render(frame, app, chunks[2]),
    }

    common::render_status_bar(frame, app, chunks[3]);

    if app.show_help {
        common::render_help(frame, app, area);
    }
}

/// Title suffix describing the filter state.
pub(crate) fn filter_info(app: &App) -> String {
    if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{run, MockBackend};
    use crate::source::{Histogram, RunStatus};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    async fn loaded_app() -> App {
        let backend = MockBackend::new();
        backend.add_process("ttbar", &["run_01", "run_02"]);
        let mut done = run("run_01", RunStatus::Done, 1.0);
        done.histograms = vec![Histogram {
            name: "pt".to_string(),
            min: 0.0,
            max: 10.0,
            bin_values: vec![0.0, 1.0, 4.0, 2.0, 0.0],
            bin_errors: vec![0.0, 0.1, 0.2, 0.1, 0.0],
        }];
        backend.set_runs("ttbar", vec![done, run("run_02", RunStatus::Running, 2.0)]);

        let mut app = App::with_backend(
            Arc::new(backend),
            Handle::current(),
            Duration::from_secs(10),
            Theme::dark(),
        );
        app.catalog.load();
        tokio::time::sleep(Duration::from_millis(1)).await;
        app.update();
        app.enter();
        tokio::time::sleep(Duration::from_millis(1)).await;
        app.update();
        app
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, app, frame.area())).unwrap();
        screen(&terminal)
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_view_renders() {
        let mut app = loaded_app().await;

        app.set_view(View::Processes);
        assert!(draw(&app).contains("ttbar"));

        app.set_view(View::Runs);
        let text = draw(&app);
        assert!(text.contains("run_01"));
        assert!(text.contains("running"));

        app.enter();
        let text = draw(&app);
        assert!(text.contains("Subprocesses"));
        assert!(text.contains("Channels"));

        app.set_view(View::Plots);
        let text = draw(&app);
        assert!(text.contains("pt"));
        assert!(text.contains("[x]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_help_overlay() {
        let mut app = loaded_app().await;
        app.toggle_help();
        assert!(draw(&app).contains("Keyboard Shortcuts"));
    }
}
