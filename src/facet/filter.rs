//! Filter state and facet predicates
//!
//! A [`FilterState`] maps each facet to the set of selected values. An empty
//! selection imposes no constraint. Predicates for all active facets are
//! ANDed, in the order of [`Facet::ALL`], and evaluation stops as soon as the
//! intermediate result is empty.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{Facet, FacetValue};
use crate::error::{Error, Result};
use crate::types::BenchmarkRun;

/// Selected values per facet
///
/// Immutable from the outside: every update returns a new state. Empty
/// selections are never stored, so two states that constrain the same
/// records compare equal and hash identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Facet, Vec<FacetValue>>",
    into = "BTreeMap<Facet, BTreeSet<FacetValue>>"
)]
pub struct FilterState {
    selections: BTreeMap<Facet, BTreeSet<FacetValue>>,
}

impl FilterState {
    /// Create a state with every facet unconstrained
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new state with `facet`'s selection replaced wholesale
    ///
    /// An empty `values` clears the facet. Values are taken as given; use
    /// [`FilterState::with_parsed_selection`] for untrusted input.
    pub fn with_selection<I>(&self, facet: Facet, values: I) -> Self
    where
        I: IntoIterator<Item = FacetValue>,
    {
        let values: BTreeSet<FacetValue> = values.into_iter().collect();
        let mut next = self.clone();
        if values.is_empty() {
            next.selections.remove(&facet);
        } else {
            next.selections.insert(facet, values);
        }
        next
    }

    /// Like [`FilterState::with_selection`], coercing raw strings to the facet's type
    pub fn with_parsed_selection<S: AsRef<str>>(&self, facet: Facet, raw: &[S]) -> Result<Self> {
        let values = raw
            .iter()
            .map(|s| facet.parse_value(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.with_selection(facet, values))
    }

    /// Return a new state with `facet` unconstrained
    pub fn without(&self, facet: Facet) -> Self {
        self.with_selection(facet, std::iter::empty())
    }

    /// Selected values for a facet (empty when unconstrained)
    pub fn selection(&self, facet: Facet) -> Option<&BTreeSet<FacetValue>> {
        self.selections.get(&facet)
    }

    /// Whether the facet currently constrains the dataset
    pub fn is_active(&self, facet: Facet) -> bool {
        self.selections.contains_key(&facet)
    }

    /// Facets with a non-empty selection, in predicate order
    pub fn active_facets(&self) -> impl Iterator<Item = Facet> + '_ {
        Facet::ALL.into_iter().filter(move |f| self.is_active(*f))
    }

    /// Whether no facet is constrained
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Parse `facet=v1,v2` selections as given on the command line
    pub fn parse_assignment(&self, assignment: &str) -> Result<Self> {
        let (name, values) = assignment
            .split_once('=')
            .ok_or_else(|| Error::InvalidAssignment(assignment.to_string()))?;
        let facet: Facet = name.parse()?;
        let raw: Vec<&str> = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        self.with_parsed_selection(facet, &raw)
    }
}

impl TryFrom<BTreeMap<Facet, Vec<FacetValue>>> for FilterState {
    type Error = Error;

    fn try_from(raw: BTreeMap<Facet, Vec<FacetValue>>) -> Result<Self> {
        let mut state = FilterState::new();
        for (facet, values) in raw {
            let values = values
                .into_iter()
                .map(|v| facet.coerce(v))
                .collect::<Result<Vec<_>>>()?;
            state = state.with_selection(facet, values);
        }
        Ok(state)
    }
}

impl From<FilterState> for BTreeMap<Facet, BTreeSet<FacetValue>> {
    fn from(state: FilterState) -> Self {
        state.selections
    }
}

/// Whether a run satisfies one facet's selection
///
/// An empty selection matches every run. Otherwise the run's value must be
/// present and be a member of the selection, so runs lacking an optional
/// field never match an active facet.
pub fn matches(run: &BenchmarkRun, facet: Facet, selected: &BTreeSet<FacetValue>) -> bool {
    if selected.is_empty() {
        return true;
    }
    match facet.value_of(run) {
        Some(key) => selected.iter().any(|v| v.as_key() == key),
        None => false,
    }
}

/// Apply every active facet predicate, preserving record identity and order
pub fn compute_filtered<'a>(
    records: &'a [BenchmarkRun],
    state: &FilterState,
) -> Vec<&'a BenchmarkRun> {
    let mut current: Vec<&BenchmarkRun> = records.iter().collect();

    for facet in Facet::ALL {
        if current.is_empty() {
            trace!(facet = %facet, "Filter chain short-circuited on empty result");
            break;
        }
        let Some(selected) = state.selection(facet) else {
            continue;
        };
        current.retain(|run| matches(run, facet, selected));
    }

    trace!(
        input = records.len(),
        output = current.len(),
        active_facets = state.selections.len(),
        "Computed filtered dataset"
    );
    current
}

/// Same as [`compute_filtered`], returning positions into `records`
pub fn compute_filtered_indices(records: &[BenchmarkRun], state: &FilterState) -> Vec<usize> {
    let mut current: Vec<usize> = (0..records.len()).collect();

    for facet in Facet::ALL {
        if current.is_empty() {
            break;
        }
        let Some(selected) = state.selection(facet) else {
            continue;
        };
        current.retain(|&i| matches(&records[i], facet, selected));
    }
    current
}
