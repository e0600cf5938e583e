//! Channel aggregation for run statistics.
//!
//! Folds the per-channel statistics of a run into one aggregate per
//! subprocess. Cross sections of disjoint channels add; their errors add in
//! quadrature.

use serde::Serialize;

use super::format::{format_efficiency, format_rsd, format_si_prefix, format_with_error};
use crate::source::{Channel, Run};

/// Aggregated statistics of all channels sharing a subprocess key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubprocessStats {
    pub subprocess: i64,
    /// Number of channels folded into this aggregate.
    pub channels: usize,
    pub mean: f64,
    pub error: f64,
    pub count_before_cuts: f64,
    pub count_after_cuts: f64,
    pub count_before_cuts_opt: f64,
    pub count_after_cuts_opt: f64,
    pub count_unweighted: f64,
    /// `error / mean * sqrt(count_before_cuts_opt)`; NaN or infinite when
    /// `mean` is zero.
    pub rel_std_dev: f64,
}

impl SubprocessStats {
    fn empty(subprocess: i64) -> Self {
        Self {
            subprocess,
            channels: 0,
            mean: 0.0,
            error: 0.0,
            count_before_cuts: 0.0,
            count_after_cuts: 0.0,
            count_before_cuts_opt: 0.0,
            count_after_cuts_opt: 0.0,
            count_unweighted: 0.0,
            rel_std_dev: 0.0,
        }
    }

    pub fn efficiency_before_cuts(&self) -> String {
        format_efficiency(self.count_unweighted, self.count_before_cuts_opt)
    }

    pub fn efficiency_after_cuts(&self) -> String {
        format_efficiency(self.count_unweighted, self.count_after_cuts_opt)
    }
}

/// Aggregation result for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// One entry per subprocess key, in first-seen order.
    pub subprocesses: Vec<SubprocessStats>,
    /// The run's channels, unchanged.
    pub channels: Vec<Channel>,
}

impl RunSummary {
    pub fn from_run(run: &Run) -> Self {
        aggregate(&run.channels)
    }

    /// Formatted rows for the subprocess table.
    pub fn subprocess_rows(&self) -> Vec<StatsRow> {
        self.subprocesses.iter().map(StatsRow::from_subprocess).collect()
    }

    /// Formatted rows for the channel table.
    pub fn channel_rows(&self) -> Vec<StatsRow> {
        self.channels
            .iter()
            .enumerate()
            .map(|(index, channel)| StatsRow::from_channel(index, channel))
            .collect()
    }
}

/// Group channels by subprocess and fold each group.
pub fn aggregate(channels: &[Channel]) -> RunSummary {
    let mut groups: Vec<SubprocessStats> = Vec::new();
    // sum of squared errors, parallel to `groups`
    let mut variances: Vec<f64> = Vec::new();

    for channel in channels {
        let index = match groups.iter().position(|g| g.subprocess == channel.subprocess) {
            Some(index) => index,
            None => {
                groups.push(SubprocessStats::empty(channel.subprocess));
                variances.push(0.0);
                groups.len() - 1
            }
        };

        let group = &mut groups[index];
        group.channels += 1;
        group.mean += channel.mean;
        group.count_before_cuts += channel.count;
        group.count_after_cuts += channel.count_after_cuts;
        group.count_before_cuts_opt += channel.count_opt;
        group.count_after_cuts_opt += channel.count_after_cuts_opt;
        group.count_unweighted += channel.count_unweighted;
        variances[index] += channel.error * channel.error;
    }

    for (group, variance) in groups.iter_mut().zip(variances) {
        group.error = variance.sqrt();
        group.rel_std_dev = (group.error / group.mean) * group.count_before_cuts_opt.sqrt();
    }

    RunSummary {
        subprocesses: groups,
        channels: channels.to_vec(),
    }
}

/// A display row of the subprocess or channel table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsRow {
    pub name: String,
    pub subprocess: i64,
    pub cross_section: String,
    pub samples_before_cuts: String,
    pub samples_after_cuts: String,
    pub unweighted_events: String,
    pub relative_std_dev: String,
    pub efficiency_before_cuts: String,
    pub efficiency_after_cuts: String,
}

impl StatsRow {
    pub fn from_subprocess(stats: &SubprocessStats) -> Self {
        Self {
            name: stats.subprocess.to_string(),
            subprocess: stats.subprocess,
            cross_section: format_with_error(stats.mean, stats.error),
            samples_before_cuts: format_si_prefix(stats.count_before_cuts),
            samples_after_cuts: format_si_prefix(stats.count_after_cuts),
            unweighted_events: format_si_prefix(stats.count_unweighted),
            relative_std_dev: format_rsd(stats.rel_std_dev),
            efficiency_before_cuts: stats.efficiency_before_cuts(),
            efficiency_after_cuts: stats.efficiency_after_cuts(),
        }
    }

    /// `index` is the channel's position in the run, used when it has no name.
    pub fn from_channel(index: usize, channel: &Channel) -> Self {
        let name = channel
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Channel {}", index + 1));
        Self {
            name,
            subprocess: channel.subprocess,
            cross_section: format_with_error(channel.mean, channel.error),
            samples_before_cuts: format_si_prefix(channel.count),
            samples_after_cuts: format_si_prefix(channel.count_after_cuts),
            unweighted_events: format_si_prefix(channel.count_unweighted),
            relative_std_dev: format_rsd(channel.rel_std_dev),
            efficiency_before_cuts: format_efficiency(channel.count_unweighted, channel.count_opt),
            efficiency_after_cuts: format_efficiency(
                channel.count_unweighted,
                channel.count_after_cuts_opt,
            ),
        }
    }
}

/// A display row of the run overview table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRow {
    pub run: String,
    pub cross_section: String,
    pub unweighted_events: String,
    pub status: String,
}

impl RunRow {
    pub fn from_run(run: &Run) -> Self {
        Self {
            run: run.name.clone(),
            cross_section: format_with_error(run.totals.mean, run.totals.error),
            unweighted_events: format_si_prefix(run.totals.count_unweighted),
            status: run.status.to_string(),
        }
    }
}
