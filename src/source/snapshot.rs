//! Run snapshot types.
//!
//! These types match the JSON served by the MadBoard backend. The run list
//! endpoint has shipped in two shapes (info nested under `info`, or flattened
//! next to `name`); both are folded into the canonical [`Run`] here so that
//! nothing downstream needs to know which one was received.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle status reported by the backend for a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RunStatus {
    Pending,
    Running,
    Done,
    /// Also used when the backend omits the status entirely.
    #[default]
    Unknown,
    /// A status string this client does not know; treated as still active.
    Other(String),
}

impl RunStatus {
    /// Returns true once the run will not change any more.
    ///
    /// Terminal runs are skipped by the periodic refresh.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Unknown)
    }

    /// Returns the wire label for this status.
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Done => "done",
            RunStatus::Unknown => "unknown",
            RunStatus::Other(s) => s,
        }
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => RunStatus::Pending,
            "running" => RunStatus::Running,
            "done" => RunStatus::Done,
            "unknown" | "" => RunStatus::Unknown,
            _ => RunStatus::Other(s),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RunStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(RunStatus::from)
    }
}

/// Per-channel statistics of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Grouping key for subprocess aggregation.
    #[serde(default, deserialize_with = "null_as_default")]
    pub subprocess: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Cross-section estimate.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mean: f64,
    /// Standard error of `mean`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: f64,
    /// Weighted samples before cuts.
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count_after_cuts: f64,
    /// Samples of the optimization pass, before cuts.
    #[serde(default, deserialize_with = "null_as_default")]
    pub count_opt: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count_after_cuts_opt: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count_unweighted: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rel_std_dev: f64,
}

/// Raw histogram of one run.
///
/// `bin_values` and `bin_errors` include one underflow slot at the front and
/// one overflow slot at the back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub min: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub max: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bin_values: Vec<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bin_errors: Vec<f64>,
}

/// Run-level cross section and event totals (the `process` field on the wire).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    #[serde(default, deserialize_with = "null_as_default")]
    pub mean: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count_unweighted: f64,
}

/// Body of `GET /api/processes/{p}/runs/{r}/info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: RunStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub channels: Vec<Channel>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub histograms: Vec<Histogram>,
    #[serde(default, rename = "process", deserialize_with = "null_as_default")]
    pub totals: RunTotals,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<String>,
}

/// One element of the run list, in either of the two shapes the backend emits.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RunEntry {
    /// `{ "name": ..., "info": { ... } }`
    Nested {
        name: String,
        info: RunInfo,
        #[serde(default)]
        files: Vec<String>,
    },
    /// `{ "name": ..., "status": ..., "channels": [...], ... }`
    Flat {
        name: String,
        #[serde(flatten)]
        info: RunInfo,
    },
}

/// A process and the names of its runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub runs: Vec<String>,
}

/// Body of `GET /api/processes`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessList {
    #[serde(default)]
    pub processes: Vec<ProcessEntry>,
}

/// Body of `GET /api/processes/{p}/runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunList {
    #[serde(default)]
    pub runs: Vec<RunEntry>,
}

/// Canonical run record held in the monitor cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub name: String,
    pub status: RunStatus,
    pub channels: Vec<Channel>,
    pub histograms: Vec<Histogram>,
    pub totals: RunTotals,
    pub files: Vec<String>,
}

impl Run {
    /// Build a run from its info body and the name it was requested under.
    pub fn from_info(name: impl Into<String>, info: RunInfo) -> Self {
        Self {
            name: name.into(),
            status: info.status,
            channels: info.channels,
            histograms: info.histograms,
            totals: info.totals,
            files: info.files,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_histograms(&self) -> bool {
        !self.histograms.is_empty()
    }
}

impl From<RunEntry> for Run {
    fn from(entry: RunEntry) -> Self {
        match entry {
            RunEntry::Nested {
                name,
                mut info,
                files,
            } => {
                if info.files.is_empty() {
                    info.files = files;
                }
                Run::from_info(name, info)
            }
            RunEntry::Flat { name, info } => Run::from_info(name, info),
        }
    }
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
