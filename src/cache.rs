//! Memoization of filter results
//!
//! Filtering and facet counting are pure functions of the record set and
//! the filter state, so their results can be reused for as long as both are
//! unchanged. Entries are keyed by the dataset's generation number and the
//! filter state value; loading a new dataset starts a new generation, which
//! makes every older entry unreachable.
//!
//! - LRU eviction bounded by entry count
//! - Hit/miss/eviction counters for diagnostics

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::trace;

use crate::error::Result;
use crate::facet::{
    compute_filtered_indices, compute_options_with_mode, FacetCountMode, FacetOptions,
    FilterState,
};
use crate::types::BenchmarkRun;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// Dataset
// ============================================================================

/// An immutable record set with a process-unique generation number
#[derive(Debug, Clone)]
pub struct Dataset {
    runs: Arc<[BenchmarkRun]>,
    generation: u64,
}

impl Dataset {
    /// Wrap a record set, assigning a fresh generation
    pub fn new(runs: Vec<BenchmarkRun>) -> Self {
        Self {
            runs: runs.into(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Parse a JSON array of runs
    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let runs: Vec<BenchmarkRun> = serde_json::from_reader(reader)?;
        Ok(Self::new(runs))
    }

    /// The records
    pub fn runs(&self) -> &[BenchmarkRun] {
        &self.runs
    }

    /// Generation number; differs for every constructed dataset
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the dataset has no records
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    generation: u64,
    state: FilterState,
    mode: FacetCountMode,
}

/// Cached result of filtering one dataset with one filter state
#[derive(Debug, Clone)]
pub struct FilteredView {
    /// Positions of surviving records in the dataset, in dataset order
    pub indices: Arc<[usize]>,
    /// Facet options for the filtered set
    pub options: Arc<FacetOptions>,
}

impl FilteredView {
    /// Resolve the surviving records against their dataset
    pub fn records<'a>(&self, dataset: &'a Dataset) -> Vec<&'a BenchmarkRun> {
        let runs = dataset.runs();
        self.indices.iter().map(|&i| &runs[i]).collect()
    }
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: AtomicU64,
    /// Lookups that had to compute
    pub misses: AtomicU64,
    /// Entries pushed out by capacity
    pub evictions: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to compute
    pub misses: u64,
    /// Entries pushed out by capacity
    pub evictions: u64,
    /// Entries currently held
    pub entries: usize,
}

/// LRU cache of filtered views
pub struct AnalysisCache {
    entries: Mutex<LruCache<CacheKey, FilteredView>>,
    stats: CacheStats,
}

impl AnalysisCache {
    /// Create a cache holding at most `capacity` views (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats: CacheStats::default(),
        }
    }

    /// Return the cached view or compute and store it
    pub fn get_or_compute(
        &self,
        dataset: &Dataset,
        state: &FilterState,
        mode: FacetCountMode,
    ) -> FilteredView {
        let key = CacheKey {
            generation: dataset.generation(),
            state: state.clone(),
            mode,
        };

        if let Some(view) = self.entries.lock().get(&key) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            trace!(generation = key.generation, "Filter cache hit");
            return view.clone();
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        // Computed outside the lock; a concurrent miss on the same key just
        // stores an identical view.
        let view = FilteredView {
            indices: compute_filtered_indices(dataset.runs(), state).into(),
            options: Arc::new(compute_options_with_mode(dataset.runs(), state, mode)),
        };

        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(key, view.clone()) {
            // push returns the replaced entry too; only count true evictions
            if evicted.generation != dataset.generation()
                || &evicted.state != state
                || evicted.mode != mode
            {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        view
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of cached views
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl std::fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisCache")
            .field("stats", &self.stats())
            .finish()
    }
}
