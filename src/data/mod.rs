//! Derived views of run data.
//!
//! Everything here is a pure function of the cached runs: aggregation of
//! channels into subprocess totals, display formatting, and construction of
//! histogram overlay series.
//!
//! ## Submodules
//!
//! - [`aggregate`]: Per-subprocess folding of channel statistics
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "10s", "500ms")
//! - [`format`]: Number formatting (SI prefixes, value with error)
//! - [`histogram`]: Step series, log masking and overlay colors
//!
//! ## Data Flow
//!
//! ```text
//! Run (cached)
//!    │
//!    ├──▶ aggregate() ──▶ RunSummary ──▶ StatsRow (formatted)
//!    │
//!    └──▶ build_overlays() ──▶ Overlay ──▶ Series (step points)
//! ```

pub mod aggregate;
pub mod duration;
pub mod format;
pub mod histogram;

pub use aggregate::{aggregate, RunRow, RunSummary, StatsRow, SubprocessStats};
pub use histogram::{build_overlays, Overlay, OverlaySelection, PlotPoint, Series, YScale};
