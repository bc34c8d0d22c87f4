//! FIO Analytics command line
//!
//! Loads a JSON array of benchmark runs and prints one derived view as JSON.
//!
//! # Commands
//!
//! - `options` - Facet options with counts for the current selection
//! - `filter` - Runs passing the current selection, newest first, paginated
//! - `history` - Runs inside a time window, newest first
//! - `heatmap` - Row × column metric grid
//! - `chart` - Grouped series for bar/line charts
//! - `trend` - Per-configuration time-series trends
//! - `servers` - Host/protocol/drive inventory
//! - `latest` - Most recent run of each configuration
//! - `check-config` - Validate configuration file
//!
//! # Configuration
//!
//! Configuration is read from:
//! 1. `--config` on the command line
//! 2. `FIO_ANALYTICS_CONFIG` environment variable (path to TOML file)
//! 3. `./fio-analytics.toml` in current directory
//! 4. Default configuration

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fio_analytics::aggregation::{AggregationMode, ChartRequest, HeatmapRequest};
use fio_analytics::config::MonitoringConfig;
use fio_analytics::types::parse_timestamp;
use fio_analytics::{
    AnalysisSession, Config, Dataset, Dimension, FacetCountMode, FilterState, Metric,
    PageRequest, TimeWindow,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

// =============================================================================
// CLI Definition
// =============================================================================

/// FIO Analytics - faceted exploration of storage benchmark results
#[derive(Parser)]
#[command(name = "fio-analytics")]
#[command(version)]
#[command(about = "Faceted filtering and aggregation of FIO benchmark results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (overrides FIO_ANALYTICS_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Benchmark runs as a JSON array ("-" reads stdin)
    #[arg(short, long, global = true, default_value = "-")]
    input: String,

    /// Facet selection, e.g. `block_size=4K,64K` (repeatable)
    #[arg(short, long = "select", global = true, value_name = "FACET=VALUES")]
    selections: Vec<String>,

    /// Compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Facet options with counts
    Options {
        /// Override the configured facet count mode (inclusive, exclude_self)
        #[arg(long)]
        mode: Option<FacetCountMode>,
    },

    /// Runs passing the selection, newest first
    Filter {
        /// Runs per page (1-1000)
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Runs skipped before the page
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Runs inside a time window, newest first
    History {
        /// Earliest timestamp kept (inclusive)
        #[arg(long, value_parser = parse_time)]
        start: Option<DateTime<Utc>>,
        /// Latest timestamp kept (inclusive)
        #[arg(long, value_parser = parse_time)]
        end: Option<DateTime<Utc>>,
        /// Maximum number of runs
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },

    /// Heatmap over two dimensions
    Heatmap {
        /// Row dimension
        #[arg(long, default_value = "host_drive")]
        rows: Dimension,
        /// Column dimension
        #[arg(long, default_value = "configuration")]
        cols: Dimension,
        /// Metric (defaults to the configured metric)
        #[arg(short, long)]
        metric: Option<Metric>,
        /// Aggregation mode (matrix, pairing)
        #[arg(long, default_value = "matrix")]
        mode: AggregationMode,
    },

    /// Grouped chart series
    Chart {
        /// Category axis
        #[arg(long, default_value = "block_size")]
        x: Dimension,
        /// One series per value of this dimension
        #[arg(long, default_value = "hostname")]
        group_by: Dimension,
        /// Metric (defaults to the configured metric)
        #[arg(short, long)]
        metric: Option<Metric>,
    },

    /// Per-configuration trends
    Trend {
        /// Metric (defaults to the configured metric)
        #[arg(short, long)]
        metric: Option<Metric>,
        /// Only include runs from the last N days
        #[arg(long, conflicts_with_all = ["start", "end"])]
        days: Option<u32>,
        /// Earliest timestamp kept (inclusive)
        #[arg(long, value_parser = parse_time)]
        start: Option<DateTime<Utc>>,
        /// Latest timestamp kept (inclusive)
        #[arg(long, value_parser = parse_time)]
        end: Option<DateTime<Utc>>,
    },

    /// Host/protocol/drive inventory
    Servers,

    /// Most recent run of each configuration
    Latest,

    /// Validate configuration file
    CheckConfig,
}

// =============================================================================
// Setup
// =============================================================================

fn init_tracing(monitoring: &MonitoringConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&monitoring.log_level));

    // stdout carries the JSON result, logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if monitoring.structured_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_dataset(input: &str) -> CliResult<Dataset> {
    let dataset = if input == "-" {
        Dataset::from_json_reader(io::stdin().lock())?
    } else {
        let file = File::open(input)
            .map_err(|e| format!("Failed to open input {}: {}", input, e))?;
        Dataset::from_json_reader(BufReader::new(file))?
    };
    info!(records = dataset.len(), source = input, "Loaded benchmark runs");
    Ok(dataset)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("Invalid timestamp: {}", raw))
}

fn parse_selections(selections: &[String]) -> CliResult<FilterState> {
    let mut state = FilterState::new();
    for assignment in selections {
        state = state.parse_assignment(assignment)?;
    }
    Ok(state)
}

fn print_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> CliResult<()> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", out);
    Ok(())
}

// =============================================================================
// Command Handlers
// =============================================================================

fn cmd_check_config(config: &Config, source: Option<&PathBuf>) -> CliResult<()> {
    println!("Configuration is valid!");
    match source {
        Some(path) => println!("Source: {}", path.display()),
        None => println!("Source: defaults"),
    }
    println!();
    println!("Analytics:");
    println!("  Facet count mode: {}", config.analytics.facet_count_mode);
    println!("  Default metric: {}", config.analytics.default_metric);
    println!("  Cache capacity: {}", config.analytics.cache_capacity);
    match config.analytics.trend_window_days {
        Some(days) => println!("  Trend window: {} days", days),
        None => println!("  Trend window: full history"),
    }
    println!();
    println!("Monitoring:");
    println!("  Log level: {}", config.monitoring.log_level);
    println!("  Structured logging: {}", config.monitoring.structured_logging);
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let (mut config, source) = Config::discover(cli.config.as_deref())?;
    init_tracing(&config.monitoring);
    debug!(source = ?source, "Configuration loaded");

    if let Commands::CheckConfig = cli.command {
        return cmd_check_config(&config, source.as_ref());
    }

    if let Commands::Options { mode: Some(mode) } = cli.command {
        config.analytics.facet_count_mode = mode;
    }
    if let Commands::Trend { days: Some(days), .. } = cli.command {
        config.analytics.trend_window_days = Some(days);
    }

    let dataset = load_dataset(&cli.input)?;
    let mut session = AnalysisSession::new(dataset, &config.analytics);
    session.apply(parse_selections(&cli.selections)?);

    let default_metric = config.analytics.default_metric;
    match cli.command {
        Commands::Options { .. } => print_json(&*session.options(), cli.compact)?,
        Commands::Filter { limit, offset } => {
            let page = session.page(&PageRequest { limit, offset })?;
            print_json(
                &serde_json::json!({
                    "filters": session.state(),
                    "total": page.total,
                    "page": page.page,
                    "per_page": page.per_page,
                    "records": page.runs,
                }),
                cli.compact,
            )?;
        },
        Commands::History { start, end, limit } => {
            let runs = session.history(TimeWindow::between(start, end), limit)?;
            print_json(&runs, cli.compact)?;
        },
        Commands::Heatmap { rows, cols, metric, mode } => {
            let request = HeatmapRequest {
                rows,
                cols,
                metric: metric.unwrap_or(default_metric),
                mode,
            };
            print_json(&session.heatmap(&request), cli.compact)?;
        },
        Commands::Chart { x, group_by, metric } => {
            let request = ChartRequest {
                x,
                group_by,
                metric: metric.unwrap_or(default_metric),
            };
            print_json(&session.chart(&request), cli.compact)?;
        },
        Commands::Trend { metric, start, end, .. } => {
            let metric = metric.unwrap_or(default_metric);
            let reports = if start.is_some() || end.is_some() {
                session.trends_in(metric, TimeWindow::between(start, end))
            } else {
                session.trends(metric, Utc::now())
            };
            print_json(&reports, cli.compact)?;
        },
        Commands::Servers => print_json(&session.servers(), cli.compact)?,
        Commands::Latest => print_json(&session.latest(), cli.compact)?,
        Commands::CheckConfig => {},
    }

    debug!(stats = ?session.cache_stats(), "Done");
    Ok(())
}
