//! JSON export of a process's runs.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Result};
use serde_json::{json, Value};

use crate::data::{RunRow, RunSummary};
use crate::source::Run;

/// Build the export document for `process`.
///
/// Contains the run overview rows plus, per run, the subprocess aggregates
/// and channel rows as they are shown in the run view.
pub fn process_report<'a>(process: &str, runs: impl IntoIterator<Item = &'a Run>) -> Value {
    let mut status_counts = serde_json::Map::new();
    let mut entries = Vec::new();

    for run in runs {
        let count = status_counts
            .entry(run.status.as_str().to_string())
            .or_insert_with(|| json!(0));
        *count = json!(count.as_u64().unwrap_or(0) + 1);

        let summary = RunSummary::from_run(run);
        entries.push(json!({
            "overview": RunRow::from_run(run),
            "totals": run.totals,
            "subprocesses": summary.subprocess_rows(),
            "channels": summary.channel_rows(),
            "histograms": run.histograms.iter().map(|h| h.name.as_str()).collect::<Vec<_>>(),
            "files": run.files,
        }));
    }

    json!({
        "process": process,
        "summary": {
            "runs": entries.len(),
            "status": Value::Object(status_counts),
        },
        "runs": entries,
    })
}

/// Write a report as pretty-printed JSON.
pub fn write_report(report: &Value, path: &Path) -> Result<()> {
    if report.get("runs").and_then(Value::as_array).is_none_or(|runs| runs.is_empty()) {
        bail!("No runs to export");
    }
    let json = serde_json::to_string_pretty(report)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}
