//! Heatmap aggregation
//!
//! Folds records into a row × column grid of metric values.
//!
//! - **Matrix mode** merges records sharing a (row, col) key into one cell
//!   holding the arithmetic mean; the first record seen is kept first in
//!   `source_records`.
//! - **Pairing mode** keeps every record as its own cell, so repeated runs of
//!   the same host/configuration pair stay visible.
//!
//! Records without a value for the metric, or without a key on either axis,
//! are dropped before aggregating. `min`/`max` span the post-aggregation
//! cell values and default to `0`/`100` when no cell has a value.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::RunningMean;
use crate::dimension::{self, Dimension};
use crate::error::Error;
use crate::types::{BenchmarkRun, Metric};

/// Color-scale bounds used when no cell carries a value
pub const DEFAULT_MIN: f64 = 0.0;
/// Color-scale bounds used when no cell carries a value
pub const DEFAULT_MAX: f64 = 100.0;

/// How records sharing a (row, col) key are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Average records into one cell per key
    #[default]
    Matrix,
    /// One cell per record
    Pairing,
}

impl FromStr for AggregationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "matrix" => Ok(AggregationMode::Matrix),
            "pairing" => Ok(AggregationMode::Pairing),
            other => Err(Error::Configuration(format!(
                "unknown aggregation mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationMode::Matrix => f.write_str("matrix"),
            AggregationMode::Pairing => f.write_str("pairing"),
        }
    }
}

/// What to aggregate and along which axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeatmapRequest {
    /// Row axis
    pub rows: Dimension,
    /// Column axis
    pub cols: Dimension,
    /// Metric to aggregate
    pub metric: Metric,
    /// Merge or pairing behavior
    #[serde(default)]
    pub mode: AggregationMode,
}

impl HeatmapRequest {
    /// Matrix-mode request
    pub fn matrix(rows: Dimension, cols: Dimension, metric: Metric) -> Self {
        Self {
            rows,
            cols,
            metric,
            mode: AggregationMode::Matrix,
        }
    }

    /// Pairing-mode request
    pub fn pairing(rows: Dimension, cols: Dimension, metric: Metric) -> Self {
        Self {
            rows,
            cols,
            metric,
            mode: AggregationMode::Pairing,
        }
    }
}

/// One (row, col) intersection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell<'a> {
    /// Row key
    pub row: String,
    /// Column key
    pub col: String,
    /// Aggregated value
    pub value: Option<f64>,
    /// Records contributing to the value, first seen first
    pub source_records: Vec<&'a BenchmarkRun>,
}

/// A complete heatmap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapData<'a> {
    /// Sorted row labels
    pub rows: Vec<String>,
    /// Sorted column labels
    pub cols: Vec<String>,
    /// Cells ordered by row then column label
    pub cells: Vec<HeatmapCell<'a>>,
    /// Smallest cell value
    pub min: f64,
    /// Largest cell value
    pub max: f64,
    /// Unit of the aggregated metric
    pub unit: &'static str,
}

struct Accumulator<'a> {
    row: String,
    col: String,
    mean: RunningMean,
    sources: Vec<&'a BenchmarkRun>,
}

impl<'a> Accumulator<'a> {
    fn new(row: String, col: String, value: f64, run: &'a BenchmarkRun) -> Self {
        let mut mean = RunningMean::default();
        mean.push(value);
        Self {
            row,
            col,
            mean,
            sources: vec![run],
        }
    }
}

/// Aggregate filtered records into a heatmap
pub fn aggregate<'a>(records: &[&'a BenchmarkRun], request: &HeatmapRequest) -> HeatmapData<'a> {
    let mut accumulators: Vec<Accumulator<'a>> = Vec::new();
    let mut slots: HashMap<(String, String), usize> = HashMap::new();
    let mut row_keys = BTreeSet::new();
    let mut col_keys = BTreeSet::new();
    let mut skipped = 0usize;

    for &run in records {
        let (Some(value), Some(row), Some(col)) = (
            run.metric(request.metric),
            request.rows.key_of(run),
            request.cols.key_of(run),
        ) else {
            skipped += 1;
            continue;
        };

        row_keys.insert(row.clone());
        col_keys.insert(col.clone());

        match request.mode {
            AggregationMode::Pairing => {
                accumulators.push(Accumulator::new(row, col, value, run));
            },
            AggregationMode::Matrix => {
                let key = (row, col);
                if let Some(&slot) = slots.get(&key) {
                    let acc = &mut accumulators[slot];
                    acc.mean.push(value);
                    acc.sources.push(run);
                } else {
                    slots.insert(key.clone(), accumulators.len());
                    accumulators.push(Accumulator::new(key.0, key.1, value, run));
                }
            },
        }
    }

    let rows = dimension::sort(&row_keys.into_iter().collect::<Vec<_>>(), request.rows.kind());
    let cols = dimension::sort(&col_keys.into_iter().collect::<Vec<_>>(), request.cols.kind());
    let row_pos: HashMap<&str, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (r.as_str(), i))
        .collect();
    let col_pos: HashMap<&str, usize> = cols
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let mut cells: Vec<HeatmapCell<'a>> = accumulators
        .into_iter()
        .map(|acc| HeatmapCell {
            value: acc.mean.value(),
            row: acc.row,
            col: acc.col,
            source_records: acc.sources,
        })
        .collect();
    // Stable, so duplicate pairing cells keep their input order
    cells.sort_by_key(|cell| (row_pos[cell.row.as_str()], col_pos[cell.col.as_str()]));

    let (min, max) = value_range(&cells);

    debug!(
        rows = %request.rows,
        cols = %request.cols,
        metric = %request.metric,
        mode = %request.mode,
        cells = cells.len(),
        skipped,
        "Aggregated heatmap"
    );

    HeatmapData {
        rows,
        cols,
        cells,
        min,
        max,
        unit: request.metric.unit(),
    }
}

/// Extrema over cell values, `(0, 100)` when there are none
fn value_range(cells: &[HeatmapCell<'_>]) -> (f64, f64) {
    let mut values = cells.iter().filter_map(|c| c.value).filter(|v| v.is_finite());
    let Some(first) = values.next() else {
        return (DEFAULT_MIN, DEFAULT_MAX);
    };
    values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

impl<'a> HeatmapData<'a> {
    /// Cells at one intersection (several in pairing mode)
    pub fn cells_at<'s>(
        &'s self,
        row: &'s str,
        col: &'s str,
    ) -> impl Iterator<Item = &'s HeatmapCell<'a>> + 's {
        self.cells
            .iter()
            .filter(move |c| c.row == row && c.col == col)
    }

    /// Position of a value on the color scale, in `[0, 1]`
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 || !span.is_finite() {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::Facet;
    use crate::types::tests::run;

    fn record(id: &str, block_size: &str, pattern: &str, iops: Option<f64>) -> BenchmarkRun {
        let mut r = run(id);
        r.block_size = block_size.to_string();
        r.read_write_pattern = pattern.to_string();
        r.iops = iops;
        r
    }

    fn block_by_pattern() -> HeatmapRequest {
        HeatmapRequest::matrix(
            Dimension::Facet(Facet::BlockSize),
            Dimension::Facet(Facet::Pattern),
            Metric::Iops,
        )
    }

    #[test]
    fn test_matrix_mode_averages() {
        let records = vec![
            record("1", "4K", "read", Some(100.0)),
            record("2", "4K", "read", Some(300.0)),
        ];
        let refs: Vec<_> = records.iter().collect();
        let heatmap = aggregate(&refs, &block_by_pattern());

        assert_eq!(heatmap.cells.len(), 1);
        let cell = &heatmap.cells[0];
        assert_eq!(cell.value, Some(200.0));
        assert_eq!(cell.source_records.len(), 2);
        assert_eq!(cell.source_records[0].id, "1");
        assert_eq!(heatmap.min, 200.0);
        assert_eq!(heatmap.max, 200.0);
    }

    #[test]
    fn test_pairing_mode_keeps_duplicates() {
        let records = vec![
            record("1", "4K", "read", Some(100.0)),
            record("2", "4K", "read", Some(300.0)),
        ];
        let refs: Vec<_> = records.iter().collect();
        let request = HeatmapRequest::pairing(
            Dimension::Configuration,
            Dimension::Facet(Facet::Hostname),
            Metric::Iops,
        );
        let heatmap = aggregate(&refs, &request);

        assert_eq!(heatmap.cells.len(), 2);
        assert_eq!(heatmap.rows, vec!["read 4K QD32".to_string()]);
        assert_eq!(heatmap.cols, vec!["server1".to_string()]);
        assert_eq!(heatmap.cells[0].value, Some(100.0));
        assert_eq!(heatmap.cells[1].value, Some(300.0));
        assert_eq!(heatmap.cells_at("read 4K QD32", "server1").count(), 2);
        assert_eq!(heatmap.min, 100.0);
        assert_eq!(heatmap.max, 300.0);
    }

    #[test]
    fn test_null_metrics_excluded() {
        let records = vec![
            record("1", "4K", "read", None),
            record("2", "8K", "read", Some(50.0)),
            record("3", "8K", "read", None),
        ];
        let refs: Vec<_> = records.iter().collect();
        let heatmap = aggregate(&refs, &block_by_pattern());

        assert_eq!(heatmap.rows, vec!["8K".to_string()]);
        assert_eq!(heatmap.cells.len(), 1);
        assert_eq!(heatmap.cells[0].value, Some(50.0));
        assert_eq!(heatmap.cells[0].source_records.len(), 1);
    }

    #[test]
    fn test_empty_defaults_bounds() {
        let records = vec![record("1", "4K", "read", None)];
        let refs: Vec<_> = records.iter().collect();
        let heatmap = aggregate(&refs, &block_by_pattern());
        assert!(heatmap.cells.is_empty());
        assert_eq!((heatmap.min, heatmap.max), (DEFAULT_MIN, DEFAULT_MAX));
        assert_eq!(heatmap.normalize(50.0), 0.0);

        let empty = aggregate(&[], &block_by_pattern());
        assert_eq!((empty.min, empty.max), (0.0, 100.0));
    }

    #[test]
    fn test_axes_sorted_by_dimension() {
        let records = vec![
            record("1", "1M", "write", Some(10.0)),
            record("2", "64K", "read", Some(20.0)),
            record("3", "4K", "randread", Some(30.0)),
        ];
        let refs: Vec<_> = records.iter().collect();
        let heatmap = aggregate(&refs, &block_by_pattern());

        assert_eq!(heatmap.rows, vec!["4K", "64K", "1M"]);
        assert_eq!(heatmap.cols, vec!["randread", "read", "write"]);
        let order: Vec<&str> = heatmap.cells.iter().map(|c| c.row.as_str()).collect();
        assert_eq!(order, vec!["4K", "64K", "1M"]);
        assert_eq!(heatmap.min, 10.0);
        assert_eq!(heatmap.max, 30.0);
        assert_eq!(heatmap.normalize(20.0), 0.5);
    }

    #[test]
    fn test_min_max_after_averaging() {
        let records = vec![
            record("1", "4K", "read", Some(0.0)),
            record("2", "4K", "read", Some(100.0)),
            record("3", "8K", "read", Some(60.0)),
        ];
        let refs: Vec<_> = records.iter().collect();
        let heatmap = aggregate(&refs, &block_by_pattern());
        assert_eq!(heatmap.min, 50.0);
        assert_eq!(heatmap.max, 60.0);
    }

    #[test]
    fn test_missing_axis_key_excluded() {
        let mut no_host = record("1", "4K", "read", Some(10.0));
        no_host.hostname = None;
        let records = vec![no_host, record("2", "4K", "read", Some(20.0))];
        let refs: Vec<_> = records.iter().collect();
        let request = HeatmapRequest::matrix(
            Dimension::Facet(Facet::Hostname),
            Dimension::Facet(Facet::BlockSize),
            Metric::Iops,
        );
        let heatmap = aggregate(&refs, &request);
        assert_eq!(heatmap.cells.len(), 1);
        assert_eq!(heatmap.cells[0].value, Some(20.0));
    }

    #[test]
    fn test_large_values_average_without_overflow() {
        let records = vec![
            record("1", "4K", "read", Some(1e308)),
            record("2", "4K", "read", Some(1e308)),
        ];
        let refs: Vec<_> = records.iter().collect();
        let heatmap = aggregate(&refs, &block_by_pattern());

        assert_eq!(heatmap.cells[0].value, Some(1e308));
        assert_eq!((heatmap.min, heatmap.max), (1e308, 1e308));
    }

    #[test]
    fn test_unrepresentable_mean_is_null() {
        let records = vec![
            record("1", "4K", "read", Some(-1.5e308)),
            record("2", "4K", "read", Some(1.5e308)),
        ];
        let refs: Vec<_> = records.iter().collect();
        let heatmap = aggregate(&refs, &block_by_pattern());

        assert!(heatmap.cells[0].value.map_or(true, f64::is_finite));
        assert!(heatmap.min.is_finite() && heatmap.max.is_finite());
    }

    #[test]
    fn test_cell_json_field_names() {
        let records = vec![record("1", "4K", "read", Some(10.0))];
        let refs: Vec<_> = records.iter().collect();
        let json = serde_json::to_value(aggregate(&refs, &block_by_pattern())).unwrap();
        assert!(json["cells"][0].get("sourceRecords").is_some());
        assert!(json["cells"][0].get("source_records").is_none());
    }
}
