//! Analysis session
//!
//! Ties a dataset, the current filter state and the memoization cache
//! together for one analyst session. The session only ever swaps whole
//! values: selecting facet values produces a new [`FilterState`], loading
//! data produces a new [`Dataset`] generation. All derived views are
//! recomputed (or fetched from the cache) on demand.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::aggregation::{
    aggregate, build_chart, ChartData, ChartRequest, HeatmapData, HeatmapRequest,
};
use crate::cache::{AnalysisCache, CacheStatsSnapshot, Dataset, FilteredView};
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::facet::{Facet, FacetCountMode, FacetOptions, FacetValue, FilterState};
use crate::inventory::{
    history, latest_runs, paginate, server_inventory, PageRequest, RunPage, ServerInfo,
};
use crate::trend::{trend_reports, TimeWindow, TrendReport};
use crate::types::{BenchmarkRun, Metric};

/// One analyst's view over a dataset
#[derive(Debug)]
pub struct AnalysisSession {
    dataset: Dataset,
    state: FilterState,
    mode: FacetCountMode,
    trend_window_days: Option<u32>,
    cache: Arc<AnalysisCache>,
}

impl AnalysisSession {
    /// Start a session with every facet unconstrained
    pub fn new(dataset: Dataset, config: &AnalyticsConfig) -> Self {
        let cache = Arc::new(AnalysisCache::new(config.cache_capacity));
        Self::with_cache(dataset, config, cache)
    }

    /// Start a session sharing an existing cache
    pub fn with_cache(
        dataset: Dataset,
        config: &AnalyticsConfig,
        cache: Arc<AnalysisCache>,
    ) -> Self {
        info!(
            records = dataset.len(),
            generation = dataset.generation(),
            mode = %config.facet_count_mode,
            "Analysis session started"
        );
        Self {
            dataset,
            state: FilterState::new(),
            mode: config.facet_count_mode,
            trend_window_days: config.trend_window_days,
            cache,
        }
    }

    /// Current filter state
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Current dataset
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Replace one facet's selection wholesale
    pub fn select<I>(&mut self, facet: Facet, values: I) -> &FilterState
    where
        I: IntoIterator<Item = FacetValue>,
    {
        self.state = self.state.with_selection(facet, values);
        debug!(
            facet = %facet,
            active = self.state.active_facets().count(),
            "Selection replaced"
        );
        &self.state
    }

    /// Replace one facet's selection from textual values
    pub fn select_parsed<S: AsRef<str>>(
        &mut self,
        facet: Facet,
        raw: &[S],
    ) -> Result<&FilterState> {
        self.state = self.state.with_parsed_selection(facet, raw)?;
        Ok(&self.state)
    }

    /// Install a complete filter state
    pub fn apply(&mut self, state: FilterState) {
        self.state = state;
    }

    /// Clear every selection
    pub fn reset(&mut self) {
        self.state = FilterState::new();
        debug!("Filter state reset");
    }

    /// Swap in freshly fetched data; the filter state is kept
    ///
    /// Cached views of the old generation stay in the cache, which may be
    /// shared with other sessions, and age out through LRU eviction.
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        info!(
            previous_generation = self.dataset.generation(),
            generation = dataset.generation(),
            records = dataset.len(),
            "Dataset replaced"
        );
        self.dataset = dataset;
    }

    fn view(&self) -> FilteredView {
        self.cache.get_or_compute(&self.dataset, &self.state, self.mode)
    }

    /// Records passing the current filter state
    pub fn filtered(&self) -> Vec<&BenchmarkRun> {
        self.view().records(&self.dataset)
    }

    /// Facet options for the current filter state
    pub fn options(&self) -> Arc<FacetOptions> {
        self.view().options
    }

    /// Heatmap over the filtered records
    pub fn heatmap(&self, request: &HeatmapRequest) -> HeatmapData<'_> {
        aggregate(&self.filtered(), request)
    }

    /// Grouped chart over the filtered records
    pub fn chart(&self, request: &ChartRequest) -> ChartData {
        build_chart(&self.filtered(), request)
    }

    /// Per-configuration trends over the filtered records
    ///
    /// With a configured trend window only runs from the last N days
    /// before `now` are included. A window reaching past the earliest
    /// representable time covers the full history.
    pub fn trends(&self, metric: Metric, now: DateTime<Utc>) -> Vec<TrendReport> {
        let window = self
            .trend_window_days
            .map(|days| TimeWindow::last_days(now, days))
            .unwrap_or_default();
        self.trends_in(metric, window)
    }

    /// Per-configuration trends over the filtered records inside `window`
    pub fn trends_in(&self, metric: Metric, window: TimeWindow) -> Vec<TrendReport> {
        trend_reports(&self.filtered(), metric, window)
    }

    /// Newest-first page of the filtered records
    pub fn page(&self, request: &PageRequest) -> Result<RunPage<'_>> {
        paginate(&self.filtered(), request)
    }

    /// Newest-first filtered records inside `window`, at most `limit`
    pub fn history(&self, window: TimeWindow, limit: usize) -> Result<Vec<&BenchmarkRun>> {
        history(&self.filtered(), window, limit)
    }

    /// Host/protocol/drive inventory of the filtered records
    pub fn servers(&self) -> Vec<ServerInfo> {
        server_inventory(&self.filtered())
    }

    /// Most recent filtered run of each configuration
    pub fn latest(&self) -> Vec<&BenchmarkRun> {
        latest_runs(&self.filtered())
    }

    /// Cache counters
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }
}
