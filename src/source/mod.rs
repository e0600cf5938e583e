//! Access to the run service.
//!
//! This module provides a trait-based abstraction over the REST API that
//! serves processes, runs and run files, together with the wire types and
//! their normalization into the canonical [`Run`].

mod api;
mod error;
#[cfg(test)]
pub(crate) mod mock;
mod snapshot;

pub use api::{ApiClient, ApiClientBuilder, DEFAULT_ENDPOINT};
pub use error::ApiError;
pub use snapshot::{
    Channel, Histogram, ProcessEntry, ProcessList, Run, RunEntry, RunInfo, RunList, RunStatus,
    RunTotals,
};

use std::fmt::Debug;

use async_trait::async_trait;

/// Trait for the operations the dashboard needs from the run service.
///
/// [`ApiClient`] implements it over HTTP; tests substitute in-memory
/// backends.
///
/// # Example
///
/// ```
/// use madboard::source::{ApiError, ProcessEntry, RunBackend};
///
/// async fn run_count(backend: &dyn RunBackend) -> Result<usize, ApiError> {
///     let processes: Vec<ProcessEntry> = backend.list_processes().await?;
///     Ok(processes.iter().map(|p| p.runs.len()).sum())
/// }
/// ```
#[async_trait]
pub trait RunBackend: Send + Sync + Debug {
    /// List all processes and the names of their runs.
    async fn list_processes(&self) -> Result<Vec<ProcessEntry>, ApiError>;

    /// Fetch every run of `process`.
    async fn list_runs(&self, process: &str) -> Result<Vec<Run>, ApiError>;

    /// Fetch a single run.
    async fn run_info(&self, process: &str, run: &str) -> Result<Run, ApiError>;

    async fn delete_run(&self, process: &str, run: &str) -> Result<(), ApiError>;

    async fn delete_process(&self, process: &str) -> Result<(), ApiError>;

    /// Download the raw bytes of one of a run's files.
    async fn download_file(&self, process: &str, run: &str, file: &str) -> Result<Vec<u8>, ApiError>;
}
