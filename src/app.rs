//! Application state and navigation logic.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::runtime::Handle;

use crate::data::histogram::runs_with_histograms;
use crate::data::{build_overlays, Overlay, OverlaySelection, RunSummary, YScale};
use crate::monitor::{ProcessCatalog, RunMonitor};
use crate::report;
use crate::source::{ProcessEntry, Run, RunBackend};
use crate::ui::Theme;

/// How long a status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// All processes known to the service.
    Processes,
    /// Run overview of the selected process.
    Runs,
    /// Subprocess and channel tables of the selected run.
    Run,
    /// Histogram overlays of the selected process.
    Plots,
}

impl View {
    pub const ALL: [View; 4] = [View::Processes, View::Runs, View::Run, View::Plots];

    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Processes => View::Runs,
            View::Runs => View::Run,
            View::Run => View::Plots,
            View::Plots => View::Processes,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Processes => View::Plots,
            View::Runs => View::Processes,
            View::Run => View::Runs,
            View::Plots => View::Run,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Processes => "Processes",
            View::Runs => "Runs",
            View::Run => "Run",
            View::Plots => "Plots",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            View::Processes => 0,
            View::Runs => 1,
            View::Run => 2,
            View::Plots => 3,
        }
    }
}

/// A deletion waiting for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDelete {
    Run(String),
    Process(String),
}

impl PendingDelete {
    pub fn prompt(&self) -> String {
        match self {
            PendingDelete::Run(run) => format!("Delete run {}? (y/n)", run),
            PendingDelete::Process(process) => format!("Delete process {} and all its runs? (y/n)", process),
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,

    pub catalog: ProcessCatalog,
    pub monitor: RunMonitor,

    // Navigation state
    pub selected_process_index: usize,
    pub selected_run_index: usize,
    pub selected_run: Option<String>,
    /// Cursor in the plot legend.
    pub plot_run_index: usize,
    pub selected_histogram: usize,

    // Plot options
    pub overlay: OverlaySelection,
    pub scales: HashMap<String, YScale>,

    pub pending_delete: Option<PendingDelete>,

    // Search/filter
    pub filter_text: String,
    pub filter_active: bool,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, std::time::Instant)>,

    // Derived data, rebuilt when the monitor revision or selection changes
    summary: Option<RunSummary>,
    overlays: Vec<Overlay>,
    derived_key: Option<(u64, Option<String>)>,
}

impl App {
    /// Create a new App from a catalog and a run monitor.
    pub fn new(catalog: ProcessCatalog, monitor: RunMonitor, theme: Theme) -> Self {
        Self {
            running: true,
            current_view: View::Processes,
            show_help: false,
            catalog,
            monitor,
            selected_process_index: 0,
            selected_run_index: 0,
            selected_run: None,
            plot_run_index: 0,
            selected_histogram: 0,
            overlay: OverlaySelection::new(),
            scales: HashMap::new(),
            pending_delete: None,
            filter_text: String::new(),
            filter_active: false,
            theme,
            status_message: None,
            summary: None,
            overlays: Vec::new(),
            derived_key: None,
        }
    }

    /// Create an App whose catalog and monitor share one backend.
    pub fn with_backend(
        backend: Arc<dyn RunBackend>,
        handle: Handle,
        refresh: Duration,
        theme: Theme,
    ) -> Self {
        let catalog = ProcessCatalog::new(backend.clone(), handle.clone());
        let monitor = RunMonitor::new(backend, handle, refresh);
        Self::new(catalog, monitor, theme)
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, std::time::Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_MESSAGE_TTL {
                return Some(msg);
            }
        }
        None
    }

    /// Drain background results into the UI state.
    ///
    /// Returns true if anything visible changed.
    pub fn update(&mut self) -> bool {
        let mut changed = self.catalog.poll();
        changed |= self.monitor.poll();

        for removed in self.catalog.take_removed() {
            self.set_status_message(format!("Deleted process {}", removed));
            if self.monitor.process() == Some(removed.as_str()) {
                self.monitor.select_process(None);
                self.selected_run = None;
                self.overlay.reset();
                self.current_view = View::Processes;
            }
            changed = true;
        }

        if let Some(alert) = self.catalog.take_alert().or_else(|| self.monitor.take_alert()) {
            self.set_status_message(alert);
            changed = true;
        }

        if let Some(ref run) = self.selected_run {
            if !self.monitor.cache().is_empty() && !self.monitor.cache().contains(run) {
                self.selected_run = None;
            }
        }

        self.clamp_selection();
        self.rebuild_derived();
        changed
    }

    /// Recompute summaries and overlays if their inputs changed.
    fn rebuild_derived(&mut self) {
        let key = (self.monitor.revision(), self.selected_run.clone());
        if self.derived_key.as_ref() == Some(&key) {
            return;
        }
        self.summary = self.selected_run_data().map(RunSummary::from_run);
        self.overlays = self.compute_overlays();
        self.derived_key = Some(key);
    }

    fn invalidate_derived(&mut self) {
        self.derived_key = None;
        self.rebuild_derived();
    }

    fn compute_overlays(&self) -> Vec<Overlay> {
        let cache = self.monitor.cache();
        let runs: Vec<&Run> = cache.iter().collect();
        let shown = self.overlay.resolve(self.selected_run.as_deref(), &runs);
        let selected: Vec<&Run> = runs
            .iter()
            .copied()
            .filter(|r| shown.iter().any(|s| s == &r.name))
            .collect();
        build_overlays(&selected, cache.names(), &self.scales)
    }

    /// Aggregates of the selected run.
    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Overlays of the runs currently shown on the plots.
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// The overlay of the selected histogram.
    pub fn current_overlay(&self) -> Option<&Overlay> {
        let len = self.overlays.len();
        if len == 0 {
            return None;
        }
        self.overlays.get(self.selected_histogram.min(len - 1))
    }

    /// Processes matching the filter.
    pub fn visible_processes(&self) -> Vec<&ProcessEntry> {
        self.catalog
            .processes()
            .iter()
            .filter(|p| self.matches_filter(&p.name))
            .collect()
    }

    /// Cached runs matching the filter, in list order.
    pub fn visible_runs(&self) -> Vec<&Run> {
        self.monitor
            .cache()
            .iter()
            .filter(|r| self.matches_filter(&r.name))
            .collect()
    }

    /// Runs offered in the plot legend.
    pub fn plot_runs(&self) -> Vec<String> {
        let runs: Vec<&Run> = self.monitor.cache().iter().collect();
        runs_with_histograms(&runs)
    }

    /// Runs currently overlaid on the plots.
    pub fn shown_runs(&self) -> Vec<String> {
        let runs: Vec<&Run> = self.monitor.cache().iter().collect();
        self.overlay.resolve(self.selected_run.as_deref(), &runs)
    }

    pub fn selected_run_data(&self) -> Option<&Run> {
        self.selected_run
            .as_deref()
            .and_then(|name| self.monitor.cache().get(name))
    }

    /// Get breadcrumb trail for current navigation.
    pub fn breadcrumb(&self) -> String {
        let mut parts = vec![self.monitor.process().unwrap_or("no process").to_string()];
        if let Some(ref run) = self.selected_run {
            parts.push(run.clone());
        }
        parts.push(self.current_view.label().to_string());
        parts.join(" > ")
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.set_view(self.current_view.next());
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.set_view(self.current_view.prev());
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
        self.clamp_selection();
    }

    fn list_len(&self) -> usize {
        match self.current_view {
            View::Processes => self.visible_processes().len(),
            View::Runs => self.visible_runs().len(),
            View::Plots => self.plot_runs().len(),
            View::Run => 0,
        }
    }

    fn cursor(&mut self) -> Option<&mut usize> {
        match self.current_view {
            View::Processes => Some(&mut self.selected_process_index),
            View::Runs => Some(&mut self.selected_run_index),
            View::Plots => Some(&mut self.plot_run_index),
            View::Run => None,
        }
    }

    fn clamp_selection(&mut self) {
        let max = self.list_len().saturating_sub(1);
        if let Some(cursor) = self.cursor() {
            *cursor = (*cursor).min(max);
        }
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.list_len().saturating_sub(1);
        if let Some(cursor) = self.cursor() {
            *cursor = (*cursor + n).min(max);
        }
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        if let Some(cursor) = self.cursor() {
            *cursor = cursor.saturating_sub(n);
        }
    }

    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    pub fn select_first(&mut self) {
        if let Some(cursor) = self.cursor() {
            *cursor = 0;
        }
    }

    pub fn select_last(&mut self) {
        let last = self.list_len().saturating_sub(1);
        if let Some(cursor) = self.cursor() {
            *cursor = last;
        }
    }

    /// Act on the highlighted row: select a process or a run.
    pub fn enter(&mut self) {
        match self.current_view {
            View::Processes => {
                let Some(name) = self
                    .visible_processes()
                    .get(self.selected_process_index)
                    .map(|p| p.name.clone())
                else {
                    return;
                };
                self.select_process(name);
            }
            View::Runs => {
                let Some(name) = self
                    .visible_runs()
                    .get(self.selected_run_index)
                    .map(|r| r.name.clone())
                else {
                    return;
                };
                self.selected_run = Some(name);
                self.current_view = View::Run;
                self.invalidate_derived();
            }
            View::Run | View::Plots => {}
        }
    }

    /// Start monitoring `process` and show its runs.
    pub fn select_process(&mut self, name: String) {
        if self.monitor.process() != Some(name.as_str()) {
            self.monitor.select_process(Some(name));
            self.selected_run = None;
            self.selected_run_index = 0;
            self.plot_run_index = 0;
            self.selected_histogram = 0;
            self.overlay.reset();
            self.invalidate_derived();
        }
        self.clear_filter();
        self.current_view = View::Runs;
    }

    /// Reload the data behind the current view.
    pub fn refresh(&mut self) {
        match self.current_view {
            View::Processes => self.catalog.load(),
            _ => self.monitor.refresh(),
        }
        self.set_status_message("Refreshing...".to_string());
    }

    /// Ask for confirmation before deleting the highlighted run.
    pub fn request_delete_run(&mut self) {
        let target = match self.current_view {
            View::Runs => self
                .visible_runs()
                .get(self.selected_run_index)
                .map(|r| r.name.clone()),
            View::Run => self.selected_run.clone(),
            _ => None,
        };
        if let Some(run) = target {
            self.pending_delete = Some(PendingDelete::Run(run));
        }
    }

    /// Ask for confirmation before deleting the highlighted process.
    pub fn request_delete_process(&mut self) {
        if self.current_view != View::Processes {
            return;
        }
        if let Some(process) = self
            .visible_processes()
            .get(self.selected_process_index)
            .map(|p| p.name.clone())
        {
            self.pending_delete = Some(PendingDelete::Process(process));
        }
    }

    /// Carry out the pending deletion.
    pub fn confirm_delete(&mut self) {
        match self.pending_delete.take() {
            Some(PendingDelete::Run(run)) => {
                self.monitor.delete_run(&run);
                self.set_status_message(format!("Deleting run {}...", run));
            }
            Some(PendingDelete::Process(process)) => {
                self.catalog.delete_process(&process);
                self.set_status_message(format!("Deleting process {}...", process));
            }
            None => {}
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Toggle the run under the legend cursor in the overlay.
    pub fn toggle_overlay_run(&mut self) {
        let Some(run) = self.plot_runs().get(self.plot_run_index).cloned() else {
            return;
        };
        let cache = self.monitor.cache();
        let runs: Vec<&Run> = cache.iter().collect();
        self.overlay.toggle(&run, self.selected_run.as_deref(), &runs);
        self.invalidate_derived();
    }

    pub fn select_all_overlay(&mut self) {
        let cache = self.monitor.cache();
        let runs: Vec<&Run> = cache.iter().collect();
        self.overlay.select_all(&runs);
        self.invalidate_derived();
    }

    pub fn deselect_all_overlay(&mut self) {
        self.overlay.deselect_all();
        self.invalidate_derived();
    }

    /// Toggle linear/log scale of the selected histogram.
    pub fn toggle_log_scale(&mut self) {
        let Some(name) = self.current_overlay().map(|o| o.name.clone()) else {
            return;
        };
        let scale = self.scales.entry(name).or_default();
        *scale = scale.toggle();
        self.invalidate_derived();
    }

    pub fn next_histogram(&mut self) {
        let len = self.overlays.len();
        if len > 0 {
            self.selected_histogram = (self.selected_histogram.min(len - 1) + 1) % len;
        }
    }

    pub fn prev_histogram(&mut self) {
        let len = self.overlays.len();
        if len > 0 {
            self.selected_histogram = (self.selected_histogram.min(len - 1) + len - 1) % len;
        }
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Enter filter input mode (starts capturing keystrokes for search).
    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Exit filter input mode without clearing the filter text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    /// Clear the filter text and exit filter mode.
    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
    }

    /// Append a character to the filter text.
    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.clamp_selection();
    }

    /// Remove the last character from the filter text.
    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
    }

    /// Check if a name matches the current filter.
    pub fn matches_filter(&self, name: &str) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        name.to_lowercase().contains(&self.filter_text.to_lowercase())
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
        self.monitor.stop();
    }

    /// Export the cached runs of the selected process to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some(process) = self.monitor.process() else {
            anyhow::bail!("No process selected");
        };
        let report = report::process_report(process, self.monitor.cache().iter());
        report::write_report(&report, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{run, MockBackend};
    use crate::source::{Histogram, RunStatus};

    fn histogram(name: &str) -> Histogram {
        Histogram {
            name: name.to_string(),
            min: 0.0,
            max: 1.0,
            bin_values: vec![0.0, 1.0, 2.0, 0.0],
            bin_errors: vec![0.0; 4],
        }
    }

    fn backend() -> MockBackend {
        let backend = MockBackend::new();
        backend.add_process("ttbar", &["run_01", "run_02", "run_03"]);
        backend.add_process("dy", &["run_01"]);

        let mut a = run("run_01", RunStatus::Done, 1.0);
        a.histograms = vec![histogram("pt"), histogram("eta")];
        let b = run("run_02", RunStatus::Running, 2.0);
        let mut c = run("run_03", RunStatus::Done, 3.0);
        c.histograms = vec![histogram("pt")];
        backend.set_runs("ttbar", vec![a, b, c]);
        backend.set_runs("dy", vec![run("run_01", RunStatus::Done, 9.0)]);
        backend
    }

    fn app(backend: &MockBackend) -> App {
        App::with_backend(
            Arc::new(backend.clone()),
            Handle::current(),
            Duration::from_secs(10),
            Theme::dark(),
        )
    }

    async fn settle(app: &mut App) {
        tokio::time::sleep(Duration::from_millis(1)).await;
        app.update();
    }

    async fn app_on_ttbar(backend: &MockBackend) -> App {
        let mut app = app(backend);
        app.catalog.load();
        settle(&mut app).await;
        app.enter();
        settle(&mut app).await;
        app
    }

    #[test]
    fn test_view_cycle() {
        for view in View::ALL {
            assert_eq!(view.next().prev(), view);
            assert_eq!(View::ALL[view.index()], view);
        }
        assert_eq!(View::Plots.next(), View::Processes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_selects_process_then_run() {
        let backend = backend();
        let mut app = app_on_ttbar(&backend).await;

        assert_eq!(app.current_view, View::Runs);
        assert_eq!(app.monitor.process(), Some("ttbar"));
        assert_eq!(app.visible_runs().len(), 3);

        app.select_next();
        app.enter();
        assert_eq!(app.current_view, View::Run);
        assert_eq!(app.selected_run.as_deref(), Some("run_02"));
        assert!(app.summary().unwrap().channels.is_empty());
        assert_eq!(app.breadcrumb(), "ttbar > run_02 > Run");
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_limits_rows() {
        let backend = backend();
        let mut app = app_on_ttbar(&backend).await;

        app.start_filter();
        for c in "03".chars() {
            app.filter_push(c);
        }
        let names: Vec<&str> = app.visible_runs().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["run_03"]);

        app.enter();
        assert_eq!(app.selected_run.as_deref(), Some("run_03"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_process_resets_selection() {
        let backend = backend();
        let mut app = app_on_ttbar(&backend).await;
        app.enter();
        assert!(app.selected_run.is_some());

        app.set_view(View::Processes);
        app.select_next();
        app.enter();
        assert_eq!(app.monitor.process(), Some("dy"));
        assert!(app.selected_run.is_none());
        assert!(app.monitor.cache().is_empty());

        settle(&mut app).await;
        assert_eq!(app.visible_runs().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_defaults_and_toggle() {
        let backend = backend();
        let mut app = app_on_ttbar(&backend).await;

        // no run selected: every run with histograms
        assert_eq!(app.shown_runs(), vec!["run_01", "run_03"]);
        let names: Vec<&str> = app.overlays().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["pt", "eta"]);
        assert_eq!(app.overlays()[0].series.len(), 2);

        app.set_view(View::Plots);
        app.toggle_overlay_run();
        assert_eq!(app.shown_runs(), vec!["run_03"]);
        assert_eq!(app.overlays().len(), 1);

        app.deselect_all_overlay();
        assert!(app.overlays().is_empty());
        app.select_all_overlay();
        assert_eq!(app.shown_runs(), vec!["run_01", "run_03"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_scale_is_per_histogram() {
        let backend = backend();
        let mut app = app_on_ttbar(&backend).await;
        app.set_view(View::Plots);

        app.toggle_log_scale();
        assert_eq!(app.current_overlay().unwrap().scale, YScale::Log);

        app.next_histogram();
        assert_eq!(app.current_overlay().unwrap().name, "eta");
        assert_eq!(app.current_overlay().unwrap().scale, YScale::Linear);

        app.next_histogram();
        assert_eq!(app.current_overlay().unwrap().name, "pt");
        app.prev_histogram();
        assert_eq!(app.current_overlay().unwrap().name, "eta");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_run_needs_confirmation() {
        let backend = backend();
        let mut app = app_on_ttbar(&backend).await;

        app.request_delete_run();
        assert_eq!(app.pending_delete, Some(PendingDelete::Run("run_01".to_string())));
        app.cancel_delete();
        settle(&mut app).await;
        assert_eq!(backend.count("delete:ttbar/run_01"), 0);

        app.request_delete_run();
        app.confirm_delete();
        settle(&mut app).await;
        settle(&mut app).await;
        assert_eq!(backend.count("delete:ttbar/run_01"), 1);
        assert_eq!(app.visible_runs().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_shows_alert() {
        let backend = backend();
        backend.fail("delete:ttbar/run_01");
        let mut app = app_on_ttbar(&backend).await;

        app.request_delete_run();
        app.confirm_delete();
        settle(&mut app).await;

        assert!(app.get_status_message().unwrap().contains("Failed to delete run_01"));
        assert_eq!(app.visible_runs().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_selected_process_clears_selection() {
        let backend = backend();
        let mut app = app_on_ttbar(&backend).await;

        app.set_view(View::Processes);
        app.select_first();
        app.request_delete_process();
        assert_eq!(app.pending_delete, Some(PendingDelete::Process("ttbar".to_string())));
        app.confirm_delete();
        settle(&mut app).await;

        assert_eq!(app.monitor.process(), None);
        assert_eq!(app.current_view, View::Processes);
        settle(&mut app).await;
        assert_eq!(app.catalog.processes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_state() {
        let backend = backend();
        let app = app_on_ttbar(&backend).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("madboard_export.json");

        app.export_state(&path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["process"], "ttbar");
        assert_eq!(written["runs"].as_array().unwrap().len(), 3);
    }
}
