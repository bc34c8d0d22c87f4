//! Facet option counting
//!
//! Derives, for every facet, the values still present in a result set and
//! how often each occurs. Counting is a single pass over the records with
//! one hash map per facet, so the cost is O(records × facets) regardless of
//! how many distinct values a facet has.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::filter::{compute_filtered, FilterState};
use super::{Facet, FacetKey, FacetValue};
use crate::dimension;
use crate::error::Error;
use crate::types::BenchmarkRun;

/// One selectable value of a facet with its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOption {
    /// The value as used in selections
    pub value: FacetValue,
    /// Display label
    pub label: String,
    /// Number of records carrying this value (never zero)
    pub count: usize,
}

/// Options for every facet
pub type FacetOptions = BTreeMap<Facet, Vec<FacetOption>>;

/// Which records a facet's own options are counted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetCountMode {
    /// Count from the set filtered by every active facet, including the
    /// facet being counted. Selecting a value can hide sibling values.
    #[default]
    Inclusive,
    /// Count each facet from the set filtered by every other active facet
    ExcludeSelf,
}

impl fmt::Display for FacetCountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetCountMode::Inclusive => f.write_str("inclusive"),
            FacetCountMode::ExcludeSelf => f.write_str("exclude_self"),
        }
    }
}

impl FromStr for FacetCountMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "inclusive" => Ok(FacetCountMode::Inclusive),
            "exclude_self" => Ok(FacetCountMode::ExcludeSelf),
            other => Err(Error::Configuration(format!(
                "unknown facet count mode '{}', expected inclusive or exclude_self",
                other
            ))),
        }
    }
}

type Counter<'a> = HashMap<FacetKey<'a>, usize>;

/// Count values of `facets` in one pass over `records`
fn count<'a>(records: &[&'a BenchmarkRun], facets: &[Facet]) -> Vec<Counter<'a>> {
    let mut counters: Vec<Counter<'a>> = vec![HashMap::new(); facets.len()];
    for &run in records {
        for (facet, counter) in facets.iter().zip(counters.iter_mut()) {
            if let Some(key) = facet.value_of(run) {
                *counter.entry(key).or_insert(0) += 1;
            }
        }
    }
    counters
}

/// Natural order of two values of the same facet
fn compare_values(facet: Facet, a: &FacetKey<'_>, b: &FacetKey<'_>) -> Ordering {
    match (a, b) {
        (FacetKey::Int(x), FacetKey::Int(y)) => x.cmp(y),
        (FacetKey::Text(x), FacetKey::Text(y)) => dimension::compare(x, y, facet.dimension_kind()),
        // A facet has a single declared value type; keep the order total anyway
        (FacetKey::Int(_), FacetKey::Text(_)) => Ordering::Less,
        (FacetKey::Text(_), FacetKey::Int(_)) => Ordering::Greater,
    }
}

/// Turn a counter into options sorted by count desc, then by value
fn emit(facet: Facet, counter: Counter<'_>) -> Vec<FacetOption> {
    let mut entries: Vec<(FacetKey<'_>, usize)> =
        counter.into_iter().filter(|(_, n)| *n > 0).collect();
    entries.sort_by(|(ka, na), (kb, nb)| nb.cmp(na).then_with(|| compare_values(facet, ka, kb)));

    entries
        .into_iter()
        .map(|(key, count)| FacetOption {
            value: key.to_owned_value(),
            label: facet.label_for(&key),
            count,
        })
        .collect()
}

/// Options for every facet, counted from an already filtered record set
pub fn compute_options(filtered: &[&BenchmarkRun]) -> FacetOptions {
    let counters = count(filtered, &Facet::ALL);
    Facet::ALL
        .into_iter()
        .zip(counters)
        .map(|(facet, counter)| (facet, emit(facet, counter)))
        .collect()
}

/// Filter `records` by `state` and count options according to `mode`
pub fn compute_options_with_mode(
    records: &[BenchmarkRun],
    state: &FilterState,
    mode: FacetCountMode,
) -> FacetOptions {
    let filtered = compute_filtered(records, state);
    let mut options = compute_options(&filtered);

    if mode == FacetCountMode::ExcludeSelf {
        for facet in state.active_facets() {
            let relaxed = compute_filtered(records, &state.without(facet));
            let counter = count(&relaxed, &[facet]).pop().unwrap_or_default();
            options.insert(facet, emit(facet, counter));
        }
    }

    debug!(
        records = records.len(),
        filtered = filtered.len(),
        mode = %mode,
        "Computed facet options"
    );
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::run;

    fn with_drive_types(types: &[&str]) -> Vec<BenchmarkRun> {
        types
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut r = run(&i.to_string());
                r.drive_type = t.to_string();
                r
            })
            .collect()
    }

    #[test]
    fn test_counts_sorted_by_count_desc() {
        let records = with_drive_types(&["A", "A", "B"]);
        let refs: Vec<_> = records.iter().collect();
        let options = compute_options(&refs);
        let drive_types = &options[&Facet::DriveType];
        assert_eq!(drive_types.len(), 2);
        assert_eq!(drive_types[0].value, FacetValue::from("A"));
        assert_eq!(drive_types[0].count, 2);
        assert_eq!(drive_types[1].value, FacetValue::from("B"));
        assert_eq!(drive_types[1].count, 1);
    }

    #[test]
    fn test_ties_use_natural_order() {
        let mut records = Vec::new();
        for (i, bs) in ["64K", "4K", "1M", "8K"].iter().enumerate() {
            let mut r = run(&i.to_string());
            r.block_size = bs.to_string();
            r.queue_depth = [128, 4, 32, 16][i];
            records.push(r);
        }
        let refs: Vec<_> = records.iter().collect();
        let options = compute_options(&refs);

        let block_sizes: Vec<String> = options[&Facet::BlockSize]
            .iter()
            .map(|o| o.value.to_string())
            .collect();
        assert_eq!(block_sizes, vec!["4K", "8K", "64K", "1M"]);

        let depths: Vec<FacetValue> = options[&Facet::QueueDepth]
            .iter()
            .map(|o| o.value.clone())
            .collect();
        assert_eq!(
            depths,
            vec![
                FacetValue::Int(4),
                FacetValue::Int(16),
                FacetValue::Int(32),
                FacetValue::Int(128)
            ]
        );
    }

    #[test]
    fn test_absent_values_not_counted() {
        let mut records = with_drive_types(&["A", "A"]);
        records[0].hostname = None;
        let refs: Vec<_> = records.iter().collect();
        let options = compute_options(&refs);
        let hosts = &options[&Facet::Hostname];
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].count, 1);
    }

    #[test]
    fn test_empty_input_yields_empty_lists() {
        let options = compute_options(&[]);
        assert_eq!(options.len(), Facet::ALL.len());
        assert!(options.values().all(|o| o.is_empty()));
    }

    #[test]
    fn test_inclusive_mode_hides_unselected_siblings() {
        let records = with_drive_types(&["A", "A", "B"]);
        let state = FilterState::new().with_selection(Facet::DriveType, [FacetValue::from("A")]);
        let options = compute_options_with_mode(&records, &state, FacetCountMode::Inclusive);
        let drive_types = &options[&Facet::DriveType];
        assert_eq!(drive_types.len(), 1);
        assert_eq!(drive_types[0].count, 2);
    }

    #[test]
    fn test_exclude_self_mode_keeps_siblings() {
        let mut records = with_drive_types(&["A", "A", "B"]);
        records[2].queue_depth = 1;
        let state = FilterState::new().with_selection(Facet::DriveType, [FacetValue::from("A")]);
        let options = compute_options_with_mode(&records, &state, FacetCountMode::ExcludeSelf);

        let drive_types = &options[&Facet::DriveType];
        assert_eq!(drive_types.len(), 2);
        assert_eq!(drive_types[1].value, FacetValue::from("B"));

        // Other facets still reflect the full selection
        let depths = &options[&Facet::QueueDepth];
        assert_eq!(depths.len(), 1);
        assert_eq!(depths[0].value, FacetValue::Int(32));
    }

    #[test]
    fn test_count_mode_parse() {
        assert_eq!(
            "exclude_self".parse::<FacetCountMode>().unwrap(),
            FacetCountMode::ExcludeSelf
        );
        assert!("both".parse::<FacetCountMode>().is_err());
    }
}
