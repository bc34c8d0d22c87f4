//! Trend analysis over time-ordered metric samples
//!
//! [`compute_trend`] works on one configuration's series that the caller has
//! already isolated and ordered by timestamp. It never groups or merges
//! series itself; [`split_by_configuration`] is the helper that builds such
//! series from a record set.
//!
//! - Moving average: mean over the index window `i-1..=i+1` clipped to the
//!   series, i.e. three samples inside and two at either end. Sampling
//!   intervals do not affect the window.
//! - Percent change: `(v[i] - v[i-1]) / v[i-1] * 100` rounded to two
//!   decimals, or `"N/A"` for the first sample and a zero predecessor.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::types::{BenchmarkRun, Metric};

/// One sample of a metric series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSample {
    /// Timestamp as recorded on the run
    pub timestamp: String,
    /// Metric value
    pub value: f64,
}

impl TrendSample {
    /// Create a sample
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// Relative change against the previous sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    /// Change in percent, rounded to two decimals
    Value(f64),
    /// No previous sample, or the previous value was zero
    NotAvailable,
}

impl PercentChange {
    /// Change from `previous` to `current`
    pub fn between(previous: f64, current: f64) -> Self {
        if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
            return PercentChange::NotAvailable;
        }
        let pct = (current - previous) / previous * 100.0;
        if !pct.is_finite() {
            return PercentChange::NotAvailable;
        }
        PercentChange::Value((pct * 100.0).round() / 100.0)
    }

    /// Numeric value, if available
    pub fn value(&self) -> Option<f64> {
        match self {
            PercentChange::Value(v) => Some(*v),
            PercentChange::NotAvailable => None,
        }
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Avoid printing "-0%"
            PercentChange::Value(v) if *v == 0.0 => f.write_str("0%"),
            PercentChange::Value(v) => write!(f, "{}%", v),
            PercentChange::NotAvailable => f.write_str("N/A"),
        }
    }
}

impl Serialize for PercentChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One point of a computed trend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Sample timestamp
    pub timestamp: String,
    /// Sample value
    pub value: f64,
    /// Centered three-sample moving average
    pub moving_average: f64,
    /// Change against the previous sample
    pub percent_change: PercentChange,
}

/// Compute moving averages and percent changes for an ordered series
pub fn compute_trend(series: &[TrendSample]) -> Vec<TrendPoint> {
    let len = series.len();
    series
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let lo = i.saturating_sub(1);
            let hi = (i + 1).min(len - 1);
            let window = &series[lo..=hi];
            // Scaled before summing so finite values never overflow
            let n = window.len() as f64;
            let moving_average = window.iter().map(|s| s.value / n).sum::<f64>();

            let percent_change = if i == 0 {
                PercentChange::NotAvailable
            } else {
                PercentChange::between(series[i - 1].value, sample.value)
            };

            TrendPoint {
                timestamp: sample.timestamp.clone(),
                value: sample.value,
                moving_average,
                percent_change,
            }
        })
        .collect()
}

/// Aggregate statistics over a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    /// Number of samples
    pub total_points: usize,
    /// Smallest value
    pub min_value: f64,
    /// Largest value
    pub max_value: f64,
    /// Arithmetic mean
    pub avg_value: f64,
    /// First value in time order
    pub first_value: f64,
    /// Last value in time order
    pub last_value: f64,
    /// Change from first to last value
    pub overall_change: PercentChange,
}

/// Mean from a precomputed sum, rescaling when the sum overflowed
fn mean(series: &[TrendSample], sum: f64) -> f64 {
    let n = series.len() as f64;
    if sum.is_finite() {
        sum / n
    } else {
        series.iter().map(|s| s.value / n).sum()
    }
}

/// Summarize a series, `None` when it is empty
pub fn summarize(series: &[TrendSample]) -> Option<TrendSummary> {
    let first = series.first()?.value;
    let last = series.last()?.value;
    let (min, max, sum) = series.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(lo, hi, sum), s| (lo.min(s.value), hi.max(s.value), sum + s.value),
    );

    Some(TrendSummary {
        total_points: series.len(),
        min_value: min,
        max_value: max,
        avg_value: mean(series, sum),
        first_value: first,
        last_value: last,
        overall_change: PercentChange::between(first, last),
    })
}

// ============================================================================
// Time windows
// ============================================================================

/// Inclusive `[start, end]` time range; a missing bound is open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    /// Earliest instant kept
    pub start: Option<DateTime<Utc>>,
    /// Latest instant kept
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// No bounds
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Everything at or after `start`
    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Inclusive range; either bound may be open
    pub fn between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// The `days` days up to `now`
    ///
    /// A span reaching past the earliest representable instant leaves the
    /// start open.
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        let start = Duration::try_days(i64::from(days)).and_then(|d| now.checked_sub_signed(d));
        Self { start, end: None }
    }

    /// Whether neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether a run timestamp falls inside the window
    ///
    /// Unparsable timestamps only pass an unbounded window.
    pub fn contains(&self, timestamp: Option<DateTime<Utc>>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(ts) = timestamp else {
            return false;
        };
        self.start.map_or(true, |start| ts >= start) && self.end.map_or(true, |end| ts <= end)
    }
}

// ============================================================================
// Series extraction
// ============================================================================

/// Time-ordered series of one metric, skipping runs without a value
///
/// Runs are ordered by parsed timestamp; unparsable timestamps sort first,
/// by their raw text. Runs outside `window` are dropped.
pub fn extract_series(
    records: &[&BenchmarkRun],
    metric: Metric,
    window: TimeWindow,
) -> Vec<TrendSample> {
    let mut dated: Vec<(Option<DateTime<Utc>>, &BenchmarkRun, f64)> = records
        .iter()
        .filter_map(|&run| run.metric(metric).map(|v| (run.timestamp_utc(), run, v)))
        .filter(|(ts, _, _)| window.contains(*ts))
        .collect();

    dated.sort_by(|(ta, ra, _), (tb, rb, _)| {
        ta.cmp(tb).then_with(|| ra.timestamp.cmp(&rb.timestamp))
    });

    dated
        .into_iter()
        .map(|(_, run, value)| TrendSample::new(run.timestamp.clone(), value))
        .collect()
}

/// Split runs into one time-ordered series per unique configuration
///
/// Keyed by [`BenchmarkRun::unique_key`], so series never mix hosts,
/// protocols, drives or job options.
pub fn split_by_configuration<'a>(
    records: &[&'a BenchmarkRun],
    metric: Metric,
    window: TimeWindow,
) -> BTreeMap<String, (Vec<&'a BenchmarkRun>, Vec<TrendSample>)> {
    let mut grouped: BTreeMap<String, Vec<&'a BenchmarkRun>> = BTreeMap::new();
    for &run in records {
        grouped.entry(run.unique_key()).or_default().push(run);
    }

    grouped
        .into_iter()
        .map(|(key, runs)| {
            let series = extract_series(&runs, metric, window);
            (key, (runs, series))
        })
        .filter(|(_, (_, series))| !series.is_empty())
        .collect()
}

/// Trend of one configuration, ready for a trend view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    /// Unique configuration key
    pub configuration: String,
    /// Host of the configuration, if known
    pub hostname: Option<String>,
    /// `"{pattern} {block_size} QD{queue_depth}"`
    pub label: String,
    /// Metric analysed
    pub metric: Metric,
    /// Unit of the metric
    pub unit: &'static str,
    /// Trend points in time order
    pub points: Vec<TrendPoint>,
    /// Statistics over the series
    pub summary: Option<TrendSummary>,
}

/// Compute one trend report per configuration present in `records`
pub fn trend_reports(
    records: &[&BenchmarkRun],
    metric: Metric,
    window: TimeWindow,
) -> Vec<TrendReport> {
    let reports: Vec<TrendReport> = split_by_configuration(records, metric, window)
        .into_iter()
        .map(|(configuration, (runs, series))| {
            let exemplar = runs[0];
            TrendReport {
                configuration,
                hostname: exemplar.hostname.clone(),
                label: exemplar.configuration_label(),
                metric,
                unit: metric.unit(),
                points: compute_trend(&series),
                summary: summarize(&series),
            }
        })
        .collect();

    debug!(
        records = records.len(),
        metric = %metric,
        configurations = reports.len(),
        "Computed trend reports"
    );
    reports
}
