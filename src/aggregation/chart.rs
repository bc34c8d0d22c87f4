//! Grouped chart series
//!
//! Builds `{labels, datasets}` for bar and line charts: one label per
//! distinct key along the x dimension, one dataset per group key, each data
//! point the mean metric value of the records at that (group, label).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::color::SeriesColorAssigner;
use super::RunningMean;
use crate::dimension::{self, Dimension};
use crate::types::{BenchmarkRun, Metric};

/// What to chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartRequest {
    /// Dimension along the x axis
    pub x: Dimension,
    /// Dimension splitting records into datasets
    pub group_by: Dimension,
    /// Metric plotted on the y axis
    pub metric: Metric,
}

/// One chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    /// Group key
    pub label: String,
    /// One value per chart label; `None` where the group has no records
    pub data: Vec<Option<f64>>,
    /// Palette color
    pub color: String,
}

/// Chart-ready data
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    /// Sorted x-axis labels
    pub labels: Vec<String>,
    /// One dataset per group key, in group-dimension order
    pub datasets: Vec<ChartDataset>,
}

/// Build grouped chart data from filtered records
pub fn build_chart(records: &[&BenchmarkRun], request: &ChartRequest) -> ChartData {
    let mut means: HashMap<(String, String), RunningMean> = HashMap::new();
    let mut labels = BTreeSet::new();
    let mut groups = BTreeSet::new();

    for &run in records {
        let (Some(value), Some(label), Some(group)) = (
            run.metric(request.metric),
            request.x.key_of(run),
            request.group_by.key_of(run),
        ) else {
            continue;
        };
        labels.insert(label.clone());
        groups.insert(group.clone());
        means.entry((group, label)).or_default().push(value);
    }

    let labels = dimension::sort(&labels.into_iter().collect::<Vec<_>>(), request.x.kind());
    let groups = dimension::sort(
        &groups.into_iter().collect::<Vec<_>>(),
        request.group_by.kind(),
    );

    let mut colors = SeriesColorAssigner::new();
    let datasets: Vec<ChartDataset> = groups
        .into_iter()
        .map(|group| {
            let data = labels
                .iter()
                .map(|label| {
                    means
                        .get(&(group.clone(), label.clone()))
                        .and_then(RunningMean::value)
                })
                .collect();
            ChartDataset {
                color: colors.color_for(&group).to_string(),
                label: group,
                data,
            }
        })
        .collect();

    debug!(
        x = %request.x,
        group_by = %request.group_by,
        labels = labels.len(),
        datasets = datasets.len(),
        "Built chart data"
    );

    ChartData { labels, datasets }
}
