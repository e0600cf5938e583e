//! Histogram series construction for overlay plots.
//!
//! Converts raw histograms (including their underflow and overflow slots)
//! into step-function series. Histograms sharing a name across runs are
//! overlaid on one plot with a common x-domain.

use std::collections::HashMap;

use serde::Serialize;

use crate::source::{Histogram, Run};

/// Run colors, assigned by a run's position among all known runs.
pub const RUN_PALETTE: [Rgb; 8] = [
    Rgb(0x88, 0x84, 0xd8),
    Rgb(0x82, 0xca, 0x9d),
    Rgb(0xff, 0xc6, 0x58),
    Rgb(0xff, 0x7c, 0x7c),
    Rgb(0x8d, 0xd1, 0xe1),
    Rgb(0xd0, 0x84, 0xd0),
    Rgb(0xa4, 0xde, 0x6c),
    Rgb(0xff, 0xc6, 0x58),
];

/// Superscript digits for tick exponents, indexed by digit value.
const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// `#rrggbb` form.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

/// Y-axis scale of a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YScale {
    #[default]
    Linear,
    Log,
}

impl YScale {
    pub fn toggle(self) -> Self {
        match self {
            YScale::Linear => YScale::Log,
            YScale::Log => YScale::Linear,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            YScale::Linear => "linear",
            YScale::Log => "log",
        }
    }
}

/// One point of a step series.
///
/// `None` marks a value that cannot be drawn on the current scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: Option<f64>,
    pub band_low: Option<f64>,
    pub band_high: Option<f64>,
}

/// The series of one run within an overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub run: String,
    pub color: Rgb,
    pub points: Vec<PlotPoint>,
}

/// All runs' series for one histogram name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub name: String,
    pub scale: YScale,
    pub x_domain: (f64, f64),
    pub series: Vec<Series>,
}

impl Overlay {
    /// Range of the drawable y values and band endpoints.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        let values = self
            .series
            .iter()
            .flat_map(|s| s.points.iter())
            .flat_map(|p| [p.y, p.band_low, p.band_high])
            .flatten()
            .filter(|v| v.is_finite());

        values.fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// Build the step series of one histogram on a linear scale.
///
/// The underflow and overflow bins are dropped. For `n` interior bins the
/// result has `n + 1` points: one at the left edge of each bin and a closing
/// point at `max` that repeats the last bin. Returns an empty series when the
/// histogram has no interior bins.
pub fn step_points(histogram: &Histogram) -> Vec<PlotPoint> {
    let len = histogram.bin_values.len();
    if len <= 2 {
        return Vec::new();
    }

    let values = &histogram.bin_values[1..len - 1];
    let error_at = |i: usize| histogram.bin_errors.get(i + 1).copied().unwrap_or(0.0);
    let num_bins = values.len();
    let step = (histogram.max - histogram.min) / num_bins as f64;

    let point = |x: f64, i: usize| {
        let y = values[i];
        let err = error_at(i);
        PlotPoint {
            x,
            y: Some(y),
            band_low: Some(y - err),
            band_high: Some(y + err),
        }
    };

    let mut points: Vec<PlotPoint> =
        (0..num_bins).map(|i| point(histogram.min + i as f64 * step, i)).collect();
    points.push(point(histogram.max, num_bins - 1));
    points
}

/// Replace values that cannot be drawn on `scale` with `None`.
///
/// Logarithmic axes cannot show values `<= 0`; those become gaps rather than
/// being clamped.
pub fn mask_for_scale(points: &mut [PlotPoint], scale: YScale) {
    if scale == YScale::Linear {
        return;
    }
    let positive = |v: Option<f64>| v.filter(|&v| v > 0.0);
    for p in points.iter_mut() {
        p.y = positive(p.y);
        p.band_low = positive(p.band_low);
        p.band_high = positive(p.band_high);
    }
}

/// Common x-domain of a set of histograms: smallest `min` to largest `max`.
///
/// Falls back to `(0.0, 1.0)` when there is nothing to plot.
pub fn shared_x_domain<'a>(histograms: impl IntoIterator<Item = &'a Histogram>) -> (f64, f64) {
    let domain = histograms.into_iter().fold(None, |acc: Option<(f64, f64)>, h| match acc {
        None => Some((h.min, h.max)),
        Some((lo, hi)) => Some((lo.min(h.min), hi.max(h.max))),
    });
    domain.unwrap_or((0.0, 1.0))
}

/// Color of `run`, by its position in the full list of known run names.
///
/// Runs missing from the list get the first palette entry.
pub fn run_color(all_runs: &[String], run: &str) -> Rgb {
    let index = all_runs.iter().position(|r| r == run).unwrap_or(0);
    RUN_PALETTE[index % RUN_PALETTE.len()]
}

/// Build one overlay per histogram name across `runs`.
///
/// Overlays appear in the order histogram names are first seen. Runs lacking
/// a histogram are left out of that overlay. `scales` holds per-histogram
/// scale overrides; missing names default to linear.
pub fn build_overlays(
    runs: &[&Run],
    all_runs: &[String],
    scales: &HashMap<String, YScale>,
) -> Vec<Overlay> {
    let mut by_name: Vec<(&str, Vec<(&str, &Histogram)>)> = Vec::new();
    for run in runs {
        for histogram in &run.histograms {
            match by_name.iter_mut().find(|(name, _)| *name == histogram.name) {
                Some((_, members)) => members.push((run.name.as_str(), histogram)),
                None => by_name.push((histogram.name.as_str(), vec![(run.name.as_str(), histogram)])),
            }
        }
    }

    by_name
        .into_iter()
        .map(|(name, members)| {
            let scale = scales.get(name).copied().unwrap_or_default();
            let series: Vec<Series> = members
                .iter()
                .filter_map(|(run, histogram)| {
                    let mut points = step_points(histogram);
                    if points.is_empty() {
                        return None;
                    }
                    mask_for_scale(&mut points, scale);
                    Some(Series {
                        run: run.to_string(),
                        color: run_color(all_runs, run),
                        points,
                    })
                })
                .collect();

            let plotted = members
                .iter()
                .filter(|(run, _)| series.iter().any(|s| s.run == *run))
                .map(|(_, h)| *h);

            Overlay {
                name: name.to_string(),
                scale,
                x_domain: shared_x_domain(plotted),
                series,
            }
        })
        .collect()
}

/// Format a log-axis tick as `mantissa⋅10ⁿ`, or `10ⁿ` when the mantissa is 1.
///
/// ```
/// use madboard::data::histogram::format_scientific_tick;
///
/// assert_eq!(format_scientific_tick(0.0), "0");
/// assert_eq!(format_scientific_tick(1000.0), "10³");
/// assert_eq!(format_scientific_tick(0.025), "2.5⋅10⁻²");
/// ```
pub fn format_scientific_tick(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return format!("{}", value);
    }

    let mut exponent = value.abs().log10().floor() as i32;
    let mut rounded = (value / 10f64.powi(exponent) * 100.0).round() / 100.0;
    if rounded.abs() >= 10.0 {
        exponent += 1;
        rounded /= 10.0;
    }
    let superscript = superscript(exponent);

    if (rounded - 1.0).abs() < 0.001 {
        format!("10{}", superscript)
    } else {
        format!("{}⋅10{}", rounded, superscript)
    }
}

fn superscript(n: i32) -> String {
    let mut out = String::new();
    if n < 0 {
        out.push('⁻');
    }
    for digit in n.unsigned_abs().to_string().chars() {
        if let Some(d) = digit.to_digit(10) {
            out.push(SUPERSCRIPT_DIGITS[d as usize]);
        }
    }
    out
}

/// Which runs are overlaid on the plots.
///
/// Until the user picks runs explicitly, the overlay follows the selected run
/// (when it has histograms) or falls back to every run with histograms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySelection {
    explicit: Option<Vec<String>>,
}

impl OverlaySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget any explicit choice.
    pub fn reset(&mut self) {
        self.explicit = None;
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit.is_some()
    }

    /// Runs to display, given the selected run and the cached runs.
    pub fn resolve(&self, selected_run: Option<&str>, runs: &[&Run]) -> Vec<String> {
        if let Some(ref explicit) = self.explicit {
            return explicit.clone();
        }
        let with_histograms = runs_with_histograms(runs);
        if let Some(selected) = selected_run {
            if with_histograms.iter().any(|r| r == selected) {
                return vec![selected.to_string()];
            }
        }
        with_histograms
    }

    /// Add or remove `run`, starting from the currently resolved set.
    pub fn toggle(&mut self, run: &str, selected_run: Option<&str>, runs: &[&Run]) {
        let mut current = self.resolve(selected_run, runs);
        if let Some(pos) = current.iter().position(|r| r == run) {
            current.remove(pos);
        } else {
            current.push(run.to_string());
        }
        self.explicit = Some(current);
    }

    pub fn select_all(&mut self, runs: &[&Run]) {
        self.explicit = Some(runs_with_histograms(runs));
    }

    pub fn deselect_all(&mut self) {
        self.explicit = Some(Vec::new());
    }
}

/// Names of the runs that carry at least one histogram, in cache order.
pub fn runs_with_histograms(runs: &[&Run]) -> Vec<String> {
    runs.iter().filter(|r| r.has_histograms()).map(|r| r.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{RunStatus, RunTotals};

    fn histogram(name: &str, min: f64, max: f64, values: &[f64], errors: &[f64]) -> Histogram {
        Histogram {
            name: name.to_string(),
            min,
            max,
            bin_values: values.to_vec(),
            bin_errors: errors.to_vec(),
        }
    }

    fn run(name: &str, histograms: Vec<Histogram>) -> Run {
        Run {
            name: name.to_string(),
            status: RunStatus::Done,
            channels: Vec::new(),
            histograms,
            totals: RunTotals::default(),
            files: Vec::new(),
        }
    }

    #[test]
    fn test_step_points_trim_overflow_bins() {
        let h = histogram("pt", 0.0, 10.0, &[9.0, 1.0, 2.0, 3.0, 9.0], &[0.0, 0.1, 0.1, 0.1, 0.0]);
        let points = step_points(&h);

        assert_eq!(points.len(), 4);
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        assert!((xs[0] - 0.0).abs() < 1e-12);
        assert!((xs[1] - 10.0 / 3.0).abs() < 1e-12);
        assert!((xs[2] - 20.0 / 3.0).abs() < 1e-12);
        assert_eq!(xs[3], 10.0);

        let ys: Vec<Option<f64>> = points.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![Some(1.0), Some(2.0), Some(3.0), Some(3.0)]);
    }

    #[test]
    fn test_step_points_error_band() {
        let h = histogram("pt", 0.0, 2.0, &[0.0, 5.0, 1.0, 0.0], &[0.0, 0.5, 2.0, 0.0]);
        let points = step_points(&h);

        assert_eq!(points[0].band_low, Some(4.5));
        assert_eq!(points[0].band_high, Some(5.5));
        assert_eq!(points[1].band_low, Some(-1.0));
        assert_eq!(points[2].band_high, Some(3.0));
    }

    #[test]
    fn test_step_points_n_plus_one() {
        for n in 1..6 {
            let values = vec![1.0; n + 2];
            let h = histogram("h", 0.0, 1.0, &values, &values);
            assert_eq!(step_points(&h).len(), n + 1);
        }
    }

    #[test]
    fn test_step_points_without_interior_bins() {
        assert!(step_points(&histogram("h", 0.0, 1.0, &[1.0, 1.0], &[0.0, 0.0])).is_empty());
        assert!(step_points(&histogram("h", 0.0, 1.0, &[], &[])).is_empty());
    }

    #[test]
    fn test_log_scale_masks_non_positive() {
        let h = histogram("h", 0.0, 3.0, &[0.0, 2.0, 0.0, -1.0, 0.0], &[0.0, 3.0, 0.0, 0.0, 0.0]);
        let mut points = step_points(&h);
        mask_for_scale(&mut points, YScale::Log);

        assert_eq!(points[0].y, Some(2.0));
        assert_eq!(points[0].band_low, None);
        assert_eq!(points[0].band_high, Some(5.0));
        assert_eq!(points[1].y, None);
        assert_eq!(points[2].y, None);
        assert_eq!(points[3].y, None);
    }

    #[test]
    fn test_linear_scale_keeps_values() {
        let h = histogram("h", 0.0, 1.0, &[0.0, -2.0, 0.0], &[0.0, 0.0, 0.0]);
        let mut points = step_points(&h);
        mask_for_scale(&mut points, YScale::Linear);
        assert_eq!(points[0].y, Some(-2.0));
    }

    #[test]
    fn test_overlay_shares_x_domain() {
        let a = run("a", vec![histogram("pt", 0.0, 10.0, &[0.0, 1.0, 0.0], &[0.0; 3])]);
        let b = run("b", vec![histogram("pt", -5.0, 5.0, &[0.0, 1.0, 0.0], &[0.0; 3])]);
        let all = vec!["a".to_string(), "b".to_string()];

        let overlays = build_overlays(&[&a, &b], &all, &HashMap::new());
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].x_domain, (-5.0, 10.0));
        assert_eq!(overlays[0].series.len(), 2);
        assert_eq!(overlays[0].scale, YScale::Linear);
    }

    #[test]
    fn test_overlay_omits_runs_without_histogram() {
        let a = run(
            "a",
            vec![
                histogram("pt", 0.0, 1.0, &[0.0, 1.0, 0.0], &[0.0; 3]),
                histogram("eta", -2.0, 2.0, &[0.0, 1.0, 0.0], &[0.0; 3]),
            ],
        );
        let b = run("b", vec![histogram("pt", 0.0, 2.0, &[0.0, 1.0, 0.0], &[0.0; 3])]);
        let all = vec!["a".to_string(), "b".to_string()];

        let overlays = build_overlays(&[&a, &b], &all, &HashMap::new());
        let names: Vec<&str> = overlays.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["pt", "eta"]);

        let eta = &overlays[1];
        assert_eq!(eta.series.len(), 1);
        assert_eq!(eta.series[0].run, "a");
        assert_eq!(eta.x_domain, (-2.0, 2.0));
    }

    #[test]
    fn test_overlay_applies_scale_per_name() {
        let a = run("a", vec![histogram("pt", 0.0, 1.0, &[0.0, 0.0, 0.0], &[0.0; 3])]);
        let all = vec!["a".to_string()];
        let mut scales = HashMap::new();
        scales.insert("pt".to_string(), YScale::Log);

        let overlays = build_overlays(&[&a], &all, &scales);
        assert_eq!(overlays[0].scale, YScale::Log);
        assert!(overlays[0].series[0].points.iter().all(|p| p.y.is_none()));
        assert_eq!(overlays[0].y_range(), None);
    }

    #[test]
    fn test_colors_follow_full_run_list() {
        let all: Vec<String> = (0..10).map(|i| format!("run_{i}")).collect();
        assert_eq!(run_color(&all, "run_0"), RUN_PALETTE[0]);
        assert_eq!(run_color(&all, "run_3"), RUN_PALETTE[3]);
        assert_eq!(run_color(&all, "run_9"), RUN_PALETTE[1]);

        // filtering the displayed runs does not shift colors
        let c = run("run_3", vec![histogram("pt", 0.0, 1.0, &[0.0, 1.0, 0.0], &[0.0; 3])]);
        let overlays = build_overlays(&[&c], &all, &HashMap::new());
        assert_eq!(overlays[0].series[0].color, RUN_PALETTE[3]);
        assert_eq!(RUN_PALETTE[0].hex(), "#8884d8");
    }

    #[test]
    fn test_shared_domain_empty() {
        assert_eq!(shared_x_domain(std::iter::empty::<&Histogram>()), (0.0, 1.0));
    }

    #[test]
    fn test_scientific_ticks() {
        assert_eq!(format_scientific_tick(0.0), "0");
        assert_eq!(format_scientific_tick(1.0), "10⁰");
        assert_eq!(format_scientific_tick(100.0), "10²");
        assert_eq!(format_scientific_tick(0.001), "10⁻³");
        assert_eq!(format_scientific_tick(2500.0), "2.5⋅10³");
        assert_eq!(format_scientific_tick(3.14159e-12), "3.14⋅10⁻¹²");
        assert_eq!(format_scientific_tick(-200.0), "-2⋅10²");
        // a mantissa that rounds up to 10 moves to the next power
        assert_eq!(format_scientific_tick(999.9), "10³");
    }

    #[test]
    fn test_overlay_selection_defaults() {
        let a = run("a", vec![histogram("pt", 0.0, 1.0, &[0.0, 1.0, 0.0], &[0.0; 3])]);
        let b = run("b", Vec::new());
        let c = run("c", vec![histogram("pt", 0.0, 1.0, &[0.0, 1.0, 0.0], &[0.0; 3])]);
        let runs = [&a, &b, &c];
        let selection = OverlaySelection::new();

        assert_eq!(selection.resolve(Some("c"), &runs), vec!["c".to_string()]);
        // selected run without histograms: show all runs that have them
        assert_eq!(selection.resolve(Some("b"), &runs), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(selection.resolve(None, &runs), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_overlay_selection_toggle() {
        let a = run("a", vec![histogram("pt", 0.0, 1.0, &[0.0, 1.0, 0.0], &[0.0; 3])]);
        let c = run("c", vec![histogram("pt", 0.0, 1.0, &[0.0, 1.0, 0.0], &[0.0; 3])]);
        let runs = [&a, &c];
        let mut selection = OverlaySelection::new();

        selection.toggle("a", Some("c"), &runs);
        assert!(selection.is_explicit());
        assert_eq!(selection.resolve(Some("c"), &runs), vec!["c".to_string(), "a".to_string()]);

        selection.toggle("c", Some("c"), &runs);
        assert_eq!(selection.resolve(Some("c"), &runs), vec!["a".to_string()]);

        selection.deselect_all();
        assert!(selection.resolve(None, &runs).is_empty());

        selection.select_all(&runs);
        assert_eq!(selection.resolve(None, &runs), vec!["a".to_string(), "c".to_string()]);

        selection.reset();
        assert!(!selection.is_explicit());
    }
}
