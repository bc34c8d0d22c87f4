//! FIO Analytics - Faceted filtering and aggregation for storage benchmark results
//!
//! This library turns a flat list of FIO benchmark runs into the views an
//! analyst explores:
//! - Faceted filtering with live per-facet option counts
//! - Row × column heatmaps (averaged matrix or per-run pairing)
//! - Grouped bar/line chart series with stable colors
//! - Per-configuration time-series trends with moving averages
//! - Server inventory and latest-run selection
//!
//! All derived views are pure functions of `(records, filter state)`. The
//! [`session::AnalysisSession`] wraps them with a memoization cache keyed by
//! dataset generation and filter state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dimension;
pub mod error;
pub mod types;

/// Facet definitions, filter state and option counting
pub mod facet;

/// Heatmap, chart and color aggregation over filtered records
pub mod aggregation;

/// Time-series trend computation
pub mod trend;

/// Server inventory and latest-run selection
pub mod inventory;

/// Configuration management with TOML support
pub mod config;

/// Memoization of filter results keyed by dataset generation
pub mod cache;

/// Stateful analysis session over one dataset
pub mod session;

// Re-export main types
pub use cache::{AnalysisCache, Dataset};
pub use config::Config;
pub use dimension::Dimension;
pub use error::{Error, Result};
pub use facet::{Facet, FacetCountMode, FacetValue, FilterState};
pub use inventory::{PageRequest, RunPage};
pub use session::AnalysisSession;
pub use trend::TimeWindow;
pub use types::{BenchmarkRun, Metric};
