//! Multi-Dimensional Aggregation
//!
//! Folds filtered benchmark runs into the view models consumed by charts:
//!
//! ```text
//! filtered runs ──┬──> heatmap::aggregate  ──> HeatmapData  (matrix / pairing)
//!                 └──> chart::build_chart  ──> ChartData    (grouped series)
//!                                                   │
//!                          color::SeriesColorAssigner (stable palette slots)
//! ```
//!
//! Axis labels pass through [`crate::dimension::sort`] so block sizes,
//! queue depths and configuration keys appear in their natural order.

pub mod chart;
pub mod color;
pub mod heatmap;

pub use chart::{build_chart, ChartData, ChartDataset, ChartRequest};
pub use color::{assign_colors, SeriesColorAssigner, PALETTE};
pub use heatmap::{aggregate, AggregationMode, HeatmapCell, HeatmapData, HeatmapRequest};

/// Incremental arithmetic mean
///
/// Updated as `mean + v/k - mean/k`, so finite inputs of any magnitude keep
/// the mean finite where a plain running sum would overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RunningMean {
    mean: f64,
    count: usize,
}

impl RunningMean {
    pub(crate) fn push(&mut self, value: f64) {
        self.count += 1;
        let k = self.count as f64;
        self.mean += value / k - self.mean / k;
    }

    /// The mean, `None` when empty or not representable
    pub(crate) fn value(&self) -> Option<f64> {
        (self.count > 0 && self.mean.is_finite()).then_some(self.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_of(values: &[f64]) -> Option<f64> {
        let mut mean = RunningMean::default();
        values.iter().for_each(|v| mean.push(*v));
        mean.value()
    }

    #[test]
    fn test_running_mean() {
        assert_eq!(mean_of(&[]), None);
        assert_eq!(mean_of(&[100.0, 300.0]), Some(200.0));
        assert_eq!(mean_of(&[10.0, 20.0, 30.0]), Some(20.0));
        assert_eq!(mean_of(&[f64::MAX, f64::MAX]), Some(f64::MAX));
        assert_eq!(mean_of(&[f64::MAX, -f64::MAX]), Some(0.0));
    }
}
