//! In-memory backend for tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{ApiError, ProcessEntry, Run, RunBackend, RunStatus, RunTotals};

#[derive(Debug, Default)]
struct State {
    processes: Vec<ProcessEntry>,
    runs: HashMap<String, Vec<Run>>,
    info: HashMap<(String, String), Run>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    queued_delays: HashMap<String, VecDeque<Duration>>,
    calls: Vec<String>,
}

/// A backend whose responses are set up by the test.
///
/// Operations are keyed as `list:{p}`, `info:{p}/{r}`, `delete:{p}/{r}`,
/// `delete:{p}`, `processes` and `download:{p}/{r}/{f}`; the same keys are
/// used for failure injection, delays and the call log.
///
/// `run_info` answers with the state at the time of the call, so a delayed
/// call returns what was set up when it was issued.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockBackend {
    state: Arc<Mutex<State>>,
}

pub(crate) fn run(name: &str, status: RunStatus, mean: f64) -> Run {
    Run {
        name: name.to_string(),
        status,
        channels: Vec::new(),
        histograms: Vec::new(),
        totals: RunTotals {
            mean,
            error: 0.1,
            count_unweighted: 0.0,
        },
        files: Vec::new(),
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_process(&self, name: &str, runs: &[&str]) {
        self.state.lock().unwrap().processes.push(ProcessEntry {
            name: name.to_string(),
            runs: runs.iter().map(|r| r.to_string()).collect(),
        });
    }

    pub fn set_runs(&self, process: &str, runs: Vec<Run>) {
        self.state.lock().unwrap().runs.insert(process.to_string(), runs);
    }

    /// Response for `run_info`; falls back to the run-list entry when unset.
    pub fn set_info(&self, process: &str, run: Run) {
        self.state
            .lock()
            .unwrap()
            .info
            .insert((process.to_string(), run.name.clone()), run);
    }

    pub fn fail(&self, key: &str) {
        self.state.lock().unwrap().failing.insert(key.to_string());
    }

    pub fn recover(&self, key: &str) {
        self.state.lock().unwrap().failing.remove(key);
    }

    pub fn delay(&self, key: &str, delay: Duration) {
        self.state.lock().unwrap().delays.insert(key.to_string(), delay);
    }

    /// Delays for the next calls of `key`, one per call, before falling
    /// back to [`MockBackend::delay`].
    pub fn delay_calls(&self, key: &str, delays: &[Duration]) {
        self.state
            .lock()
            .unwrap()
            .queued_delays
            .entry(key.to_string())
            .or_default()
            .extend(delays.iter().copied());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, key: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| *c == key).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    async fn enter(&self, key: String) -> Result<(), ApiError> {
        let call = self.record(key);
        call.finish().await
    }

    fn record(&self, key: String) -> Call {
        let mut state = self.state.lock().unwrap();
        state.calls.push(key.clone());
        let queued = state.queued_delays.get_mut(&key).and_then(VecDeque::pop_front);
        let delay = queued.or_else(|| state.delays.get(&key).copied());
        let failing = state.failing.contains(&key);
        Call { key, delay, failing }
    }
}

/// One recorded call, waiting out its delay.
struct Call {
    key: String,
    delay: Option<Duration>,
    failing: bool,
}

impl Call {
    async fn finish(self) -> Result<(), ApiError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(ApiError::Http {
                status: 500,
                message: format!("{} failed", self.key),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RunBackend for MockBackend {
    async fn list_processes(&self) -> Result<Vec<ProcessEntry>, ApiError> {
        self.enter("processes".to_string()).await?;
        Ok(self.state.lock().unwrap().processes.clone())
    }

    async fn list_runs(&self, process: &str) -> Result<Vec<Run>, ApiError> {
        self.enter(format!("list:{process}")).await?;
        let state = self.state.lock().unwrap();
        state
            .runs
            .get(process)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(process.to_string()))
    }

    async fn run_info(&self, process: &str, run: &str) -> Result<Run, ApiError> {
        let call = self.record(format!("info:{process}/{run}"));
        let response = {
            let state = self.state.lock().unwrap();
            state
                .info
                .get(&(process.to_string(), run.to_string()))
                .or_else(|| {
                    state
                        .runs
                        .get(process)
                        .and_then(|runs| runs.iter().find(|r| r.name == run))
                })
                .cloned()
                .ok_or_else(|| ApiError::NotFound(run.to_string()))
        };
        call.finish().await?;
        response
    }

    async fn delete_run(&self, process: &str, run: &str) -> Result<(), ApiError> {
        self.enter(format!("delete:{process}/{run}")).await?;
        let mut state = self.state.lock().unwrap();
        if let Some(runs) = state.runs.get_mut(process) {
            runs.retain(|r| r.name != run);
        }
        Ok(())
    }

    async fn delete_process(&self, process: &str) -> Result<(), ApiError> {
        self.enter(format!("delete:{process}")).await?;
        let mut state = self.state.lock().unwrap();
        state.processes.retain(|p| p.name != process);
        state.runs.remove(process);
        Ok(())
    }

    async fn download_file(&self, process: &str, run: &str, file: &str) -> Result<Vec<u8>, ApiError> {
        self.enter(format!("download:{process}/{run}/{file}")).await?;
        Ok(format!("{process}/{run}/{file}").into_bytes())
    }
}
