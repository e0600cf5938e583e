//! # madboard
//!
//! A terminal dashboard and library for monitoring simulation runs served
//! by a run service's REST API.
//!
//! The dashboard lists processes, shows the runs of the selected process
//! with their cross sections and event counts, folds per-channel statistics
//! into subprocess aggregates, and overlays histograms of several runs.
//! Unfinished runs are refreshed periodically in the background.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐  │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│  │
//! │  │ (state) │    │(formatting)   │(rendering)   │         │  │
//! │  └────┬────┘    └──────────┘    └─────────┘    └─────────┘  │
//! │       │ poll()                                              │
//! │       ▼                                                     │
//! │  ┌─────────┐   tasks   ┌─────────┐                          │
//! │  │ monitor │──────────▶│ source  │◀── ApiClient (HTTP)      │
//! │  │ (cache) │◀──────────│ (input) │                          │
//! │  └─────────┘  results  └─────────┘                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, view navigation, and user interaction logic
//! - **[`source`]**: The [`RunBackend`] trait, its HTTP implementation
//!   [`ApiClient`], and the wire types normalized into [`Run`]
//! - **[`monitor`]**: [`RunMonitor`], the run cache of the selected process
//!   and its refresh scheduler, plus the process catalog
//! - **[`data`]**: Number formatting, channel aggregation and histogram
//!   overlay construction
//! - **[`ui`]**: Terminal rendering using ratatui
//! - **[`config`]**: Layered settings
//! - **[`report`]**: JSON export of a process's runs
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Browse the service at the default address
//! madboard
//!
//! # Open a process right away, refreshing every 5 seconds
//! madboard --url http://runs.local:5000 --process ttbar --refresh 5s
//!
//! # Export a process's runs and exit
//! madboard --process ttbar --export ttbar.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use madboard::{ApiClient, RunMonitor};
//!
//! # tokio_test::block_on(async {
//! let client = ApiClient::builder()
//!     .endpoint("http://127.0.0.1:5000")
//!     .build()
//!     .unwrap();
//! let mut monitor = RunMonitor::new(
//!     Arc::new(client),
//!     tokio::runtime::Handle::current(),
//!     std::time::Duration::from_secs(10),
//! );
//! monitor.select_process(Some("ttbar".to_string()));
//!
//! // later, e.g. once per frame
//! monitor.poll();
//! for run in monitor.cache().iter() {
//!     println!("{} {}", run.name, run.status);
//! }
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod monitor;
pub mod report;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use monitor::{Phase, ProcessCatalog, RunMonitor};
pub use source::{ApiClient, ApiError, RunBackend, Run, RunStatus};
