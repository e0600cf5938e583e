//! Run monitoring for the selected process.
//!
//! [`RunMonitor`] owns the run cache and keeps it up to date: a full run
//! list is fetched when a process is selected (or on manual refresh), and a
//! periodic refresh re-fetches every run that has not reached a terminal
//! status yet.
//!
//! Network calls run as tokio tasks and report back over an unbounded
//! channel. The owner drains that channel without blocking by calling
//! [`RunMonitor::poll`], typically once per UI tick, so the cache only ever
//! has one writer.
//!
//! ## Lifecycle
//!
//! ```text
//!              select_process(Some)           run list ok
//!   Idle ───────────────────────────▶ Fetching ───────────▶ Live ◀─┐
//!    ▲                                   │                   │    │ tick: run_info
//!    │ select_process(None)              │ run list error    └────┘ for pending runs
//!    └───────────────────────────────  Failed
//! ```
//!
//! Every message carries the epoch it was issued under. Selecting a process
//! bumps the epoch, so responses that belong to a previous selection are
//! dropped before they reach the cache.

mod cache;
pub mod catalog;

pub use cache::RunCache;
pub use catalog::ProcessCatalog;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::source::{ApiError, Run, RunBackend};

/// Refresh interval used when none is configured.
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(10);

/// Where the monitor is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No process selected.
    Idle,
    /// The run list of a newly selected process is being fetched.
    Fetching,
    /// The cache is populated and the periodic refresh is running.
    Live,
    /// The initial run list could not be loaded.
    Failed(String),
}

impl Phase {
    pub fn label(&self) -> &str {
        match self {
            Phase::Idle => "idle",
            Phase::Fetching => "loading",
            Phase::Live => "live",
            Phase::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Failed(message) => write!(f, "failed: {}", message),
            other => f.write_str(other.label()),
        }
    }
}

/// Results reported back by background tasks.
#[derive(Debug)]
enum MonitorEvent {
    RunList(Result<Vec<Run>, ApiError>),
    RunInfo {
        run: String,
        result: Result<Run, ApiError>,
    },
    Tick,
    Deleted {
        run: String,
        result: Result<(), ApiError>,
    },
}

#[derive(Debug)]
struct Tagged {
    epoch: u64,
    event: MonitorEvent,
}

/// Keeps the run cache of one process current.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use madboard::monitor::{Phase, RunMonitor, DEFAULT_REFRESH};
/// use madboard::source::ApiClient;
///
/// # tokio_test::block_on(async {
/// let client = ApiClient::builder().build().unwrap();
/// let mut monitor = RunMonitor::new(
///     Arc::new(client),
///     tokio::runtime::Handle::current(),
///     DEFAULT_REFRESH,
/// );
/// assert_eq!(*monitor.phase(), Phase::Idle);
///
/// monitor.select_process(Some("ttbar".to_string()));
/// assert_eq!(*monitor.phase(), Phase::Fetching);
/// assert!(monitor.cache().is_empty());
/// monitor.stop();
/// # });
/// ```
#[derive(Debug)]
pub struct RunMonitor {
    backend: Arc<dyn RunBackend>,
    handle: Handle,
    refresh: Duration,
    process: Option<String>,
    epoch: u64,
    phase: Phase,
    cache: RunCache,
    /// Bumped whenever the cache or the phase changes.
    revision: u64,
    last_error: Option<String>,
    alerts: VecDeque<String>,
    tx: mpsc::UnboundedSender<Tagged>,
    rx: mpsc::UnboundedReceiver<Tagged>,
    ticker: Option<JoinHandle<()>>,
    in_flight: Vec<JoinHandle<()>>,
}

impl RunMonitor {
    /// Create an idle monitor. Background work is spawned on `handle`.
    pub fn new(backend: Arc<dyn RunBackend>, handle: Handle, refresh: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            handle,
            refresh,
            process: None,
            epoch: 0,
            phase: Phase::Idle,
            cache: RunCache::new(),
            revision: 0,
            last_error: None,
            alerts: VecDeque::new(),
            tx,
            rx,
            ticker: None,
            in_flight: Vec::new(),
        }
    }

    pub fn process(&self) -> Option<&str> {
        self.process.as_deref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn cache(&self) -> &RunCache {
        &self.cache
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh
    }

    /// Counter that changes whenever the cache or phase changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Error of the last failed manual refresh, while stale data is shown.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Next user-facing alert, such as a failed deletion.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alerts.pop_front()
    }

    /// Switch to another process, or to none.
    ///
    /// The cache is cleared and all scheduled or in-flight work is cancelled
    /// before anything for the new process is requested.
    pub fn select_process(&mut self, process: Option<String>) {
        self.cancel();
        self.epoch += 1;
        self.cache.clear();
        self.last_error = None;
        self.process = process;

        match self.process.clone() {
            Some(process) => {
                info!(process = %process, "Selected process");
                self.set_phase(Phase::Fetching);
                self.fetch_run_list(process);
            }
            None => {
                info!("Cleared process selection");
                self.set_phase(Phase::Idle);
            }
        }
        self.revision += 1;
    }

    /// Re-fetch the full run list. The cache is kept until it arrives.
    pub fn refresh(&mut self) {
        let Some(process) = self.process.clone() else {
            return;
        };
        if let Phase::Failed(_) = self.phase {
            self.set_phase(Phase::Fetching);
        }
        debug!(process = %process, "Manual refresh");
        self.fetch_run_list(process);
    }

    /// Delete a run of the selected process.
    ///
    /// On success the run list is refreshed; on failure an alert is raised
    /// and the cache is left as it was.
    pub fn delete_run(&mut self, run: &str) {
        let Some(process) = self.process.clone() else {
            return;
        };
        let backend = self.backend.clone();
        let run = run.to_string();
        self.spawn(async move {
            let result = backend.delete_run(&process, &run).await;
            MonitorEvent::Deleted { run, result }
        });
    }

    /// Apply every result that has arrived since the last call.
    ///
    /// Never blocks. Returns true if the cache or phase changed.
    ///
    /// Ticks that piled up since the last call are coalesced, so pending
    /// runs are requested at most once per call.
    pub fn poll(&mut self) -> bool {
        let before = self.revision;
        let mut ticked = false;
        while let Ok(tagged) = self.rx.try_recv() {
            if tagged.epoch != self.epoch {
                debug!(epoch = tagged.epoch, current = self.epoch, "Dropping stale result");
                continue;
            }
            if let MonitorEvent::Tick = tagged.event {
                ticked = true;
                continue;
            }
            self.handle_event(tagged.event);
        }
        if ticked {
            self.handle_event(MonitorEvent::Tick);
        }
        self.in_flight.retain(|task| !task.is_finished());
        self.revision != before
    }

    /// Cancel the ticker and all in-flight requests.
    ///
    /// Results that were already queued are discarded; the cache is not
    /// written again until a process is selected.
    pub fn stop(&mut self) {
        self.cancel();
        self.epoch += 1;
    }

    fn cancel(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        for task in self.in_flight.drain(..) {
            task.abort();
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.revision += 1;
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = MonitorEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        let epoch = self.epoch;
        let handle = self.handle.spawn(async move {
            let event = task.await;
            // receiver gone means the monitor was dropped
            let _ = tx.send(Tagged { epoch, event });
        });
        self.in_flight.push(handle);
    }

    fn fetch_run_list(&mut self, process: String) {
        let backend = self.backend.clone();
        self.spawn(async move { MonitorEvent::RunList(backend.list_runs(&process).await) });
    }

    fn start_ticker(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let tx = self.tx.clone();
        let epoch = self.epoch;
        let period = self.refresh;
        debug!(?period, "Starting periodic refresh");

        self.ticker = Some(self.handle.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let tick = Tagged {
                    epoch,
                    event: MonitorEvent::Tick,
                };
                if tx.send(tick).is_err() {
                    break;
                }
            }
        }));
    }

    fn handle_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::RunList(Ok(runs)) => {
                debug!(count = runs.len(), "Received run list");
                self.cache.replace(runs);
                self.last_error = None;
                self.revision += 1;
                self.set_phase(Phase::Live);
                self.start_ticker();
            }
            MonitorEvent::RunList(Err(e)) => {
                if self.phase == Phase::Live {
                    warn!(error = %e, "Refresh failed, keeping cached runs");
                    self.last_error = Some(e.to_string());
                    self.revision += 1;
                } else {
                    warn!(error = %e, "Failed to load runs");
                    self.cache.clear();
                    self.set_phase(Phase::Failed(e.to_string()));
                }
            }
            MonitorEvent::Tick => self.refresh_pending(),
            MonitorEvent::RunInfo { run, result } => match result {
                Ok(updated) => {
                    if self.cache.merge(updated) {
                        debug!(run = %run, "Run updated");
                        self.revision += 1;
                    }
                }
                Err(e) => warn!(run = %run, error = %e, "Failed to refresh run"),
            },
            MonitorEvent::Deleted { run, result } => match result {
                Ok(()) => {
                    info!(run = %run, "Deleted run");
                    self.refresh();
                }
                Err(e) => {
                    warn!(run = %run, error = %e, "Failed to delete run");
                    self.alerts.push_back(format!("Failed to delete {}: {}", run, e));
                }
            },
        }
    }

    /// Fan out one `run_info` request per non-terminal cached run.
    fn refresh_pending(&mut self) {
        let Some(process) = self.process.clone() else {
            return;
        };
        let pending = self.cache.pending();
        debug!(count = pending.len(), "Periodic refresh");

        for run in pending {
            let backend = self.backend.clone();
            let process = process.clone();
            self.spawn(async move {
                let result = backend.run_info(&process, &run).await;
                MonitorEvent::RunInfo { run, result }
            });
        }
    }
}

impl Drop for RunMonitor {
    fn drop(&mut self) {
        self.cancel();
    }
}
