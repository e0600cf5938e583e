//! Process catalog.
//!
//! Loads the list of processes in the background and applies process
//! deletions. Drained with [`ProcessCatalog::poll`] like the run monitor.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::source::{ApiError, ProcessEntry, RunBackend};

#[derive(Debug)]
enum CatalogEvent {
    Loaded(Result<Vec<ProcessEntry>, ApiError>),
    Deleted {
        process: String,
        result: Result<(), ApiError>,
    },
}

/// The list of known processes.
#[derive(Debug)]
pub struct ProcessCatalog {
    backend: Arc<dyn RunBackend>,
    handle: Handle,
    processes: Vec<ProcessEntry>,
    loading: bool,
    error: Option<String>,
    alerts: VecDeque<String>,
    removed: Vec<String>,
    tx: mpsc::UnboundedSender<CatalogEvent>,
    rx: mpsc::UnboundedReceiver<CatalogEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl ProcessCatalog {
    pub fn new(backend: Arc<dyn RunBackend>, handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            handle,
            processes: Vec::new(),
            loading: false,
            error: None,
            alerts: VecDeque::new(),
            removed: Vec::new(),
            tx,
            rx,
            tasks: Vec::new(),
        }
    }

    pub fn processes(&self) -> &[ProcessEntry] {
        &self.processes
    }

    pub fn get(&self, name: &str) -> Option<&ProcessEntry> {
        self.processes.iter().find(|p| p.name == name)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Error of the last failed load.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.alerts.pop_front()
    }

    /// Processes deleted since the last call.
    pub fn take_removed(&mut self) -> Vec<String> {
        std::mem::take(&mut self.removed)
    }

    /// Request the process list.
    pub fn load(&mut self) {
        self.loading = true;
        let backend = self.backend.clone();
        self.spawn(async move { CatalogEvent::Loaded(backend.list_processes().await) });
    }

    /// Delete a process; the catalog reloads once it is gone.
    pub fn delete_process(&mut self, process: &str) {
        let backend = self.backend.clone();
        let process = process.to_string();
        self.spawn(async move {
            let result = backend.delete_process(&process).await;
            CatalogEvent::Deleted { process, result }
        });
    }

    /// Apply finished requests. Returns true if the catalog changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            changed = true;
            match event {
                CatalogEvent::Loaded(Ok(processes)) => {
                    debug!(count = processes.len(), "Loaded processes");
                    self.processes = processes;
                    self.loading = false;
                    self.error = None;
                }
                CatalogEvent::Loaded(Err(e)) => {
                    warn!(error = %e, "Failed to load processes");
                    self.loading = false;
                    self.error = Some(e.to_string());
                }
                CatalogEvent::Deleted { process, result } => match result {
                    Ok(()) => {
                        info!(process = %process, "Deleted process");
                        self.removed.push(process);
                        self.load();
                    }
                    Err(e) => {
                        warn!(process = %process, error = %e, "Failed to delete process");
                        self.alerts
                            .push_back(format!("Failed to delete {}: {}", process, e));
                    }
                },
            }
        }
        self.tasks.retain(|task| !task.is_finished());
        changed
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = CatalogEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.tasks.push(self.handle.spawn(async move {
            let _ = tx.send(task.await);
        }));
    }
}

impl Drop for ProcessCatalog {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockBackend;
    use std::time::Duration;

    async fn settle(catalog: &mut ProcessCatalog) {
        tokio::time::sleep(Duration::from_millis(1)).await;
        catalog.poll();
    }

    #[tokio::test(start_paused = true)]
    async fn test_load() {
        let backend = MockBackend::new();
        backend.add_process("ttbar", &["run_01", "run_02"]);
        backend.add_process("dy", &[]);
        let mut catalog = ProcessCatalog::new(Arc::new(backend.clone()), Handle::current());

        catalog.load();
        assert!(catalog.is_loading());
        settle(&mut catalog).await;

        assert!(!catalog.is_loading());
        assert_eq!(catalog.processes().len(), 2);
        assert_eq!(catalog.get("ttbar").unwrap().runs.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure() {
        let backend = MockBackend::new();
        backend.fail("processes");
        let mut catalog = ProcessCatalog::new(Arc::new(backend.clone()), Handle::current());

        catalog.load();
        settle(&mut catalog).await;

        assert!(catalog.error().is_some());
        assert!(catalog.processes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_reloads() {
        let backend = MockBackend::new();
        backend.add_process("ttbar", &["run_01"]);
        backend.add_process("dy", &[]);
        let mut catalog = ProcessCatalog::new(Arc::new(backend.clone()), Handle::current());
        catalog.load();
        settle(&mut catalog).await;

        catalog.delete_process("ttbar");
        settle(&mut catalog).await;
        settle(&mut catalog).await;

        assert_eq!(catalog.take_removed(), vec!["ttbar".to_string()]);
        assert!(catalog.take_removed().is_empty());
        assert_eq!(catalog.processes().len(), 1);
        assert_eq!(backend.count("processes"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_failure_alerts() {
        let backend = MockBackend::new();
        backend.add_process("ttbar", &[]);
        backend.fail("delete:ttbar");
        let mut catalog = ProcessCatalog::new(Arc::new(backend.clone()), Handle::current());
        catalog.load();
        settle(&mut catalog).await;

        catalog.delete_process("ttbar");
        settle(&mut catalog).await;

        assert!(catalog.take_alert().unwrap().contains("ttbar"));
        assert_eq!(catalog.processes().len(), 1);
        assert!(catalog.take_removed().is_empty());
    }
}
