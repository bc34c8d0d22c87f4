//! Run listings, server inventory and latest-run selection

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::trend::TimeWindow;
use crate::types::BenchmarkRun;

/// Largest page size accepted by [`paginate`]
pub const MAX_PAGE_SIZE: usize = 1000;

/// Largest result size accepted by [`history`]
pub const MAX_HISTORY_LIMIT: usize = 10_000;

/// Tested host/protocol/drive combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server hostname
    pub hostname: String,
    /// Storage protocol
    pub protocol: String,
    /// Drive model
    pub drive_model: String,
    /// Number of runs
    pub test_count: usize,
    /// Timestamp of the most recent run
    pub last_test_time: String,
    /// Timestamp of the earliest run
    pub first_test_time: String,
}

/// Ordering key for a run timestamp: parsed instant first, raw text second
fn time_key(run: &BenchmarkRun) -> (Option<chrono::DateTime<chrono::Utc>>, &str) {
    (run.timestamp_utc(), run.timestamp.as_str())
}

/// Group runs having both hostname and protocol by (hostname, protocol, drive model)
///
/// Ordered by last test time, most recent first.
pub fn server_inventory(records: &[&BenchmarkRun]) -> Vec<ServerInfo> {
    let mut groups: HashMap<(&str, &str, &str), (usize, &BenchmarkRun, &BenchmarkRun)> =
        HashMap::new();

    for &run in records {
        let (Some(host), Some(protocol)) = (run.hostname.as_deref(), run.protocol.as_deref()) else {
            continue;
        };
        groups
            .entry((host, protocol, run.drive_model.as_str()))
            .and_modify(|(count, first, last)| {
                *count += 1;
                if time_key(run) < time_key(first) {
                    *first = run;
                }
                if time_key(run) > time_key(last) {
                    *last = run;
                }
            })
            .or_insert((1, run, run));
    }

    let mut servers: Vec<(ServerInfo, &BenchmarkRun)> = groups
        .into_iter()
        .map(|((hostname, protocol, drive_model), (test_count, first, last))| {
            (
                ServerInfo {
                    hostname: hostname.to_string(),
                    protocol: protocol.to_string(),
                    drive_model: drive_model.to_string(),
                    test_count,
                    last_test_time: last.timestamp.clone(),
                    first_test_time: first.timestamp.clone(),
                },
                last,
            )
        })
        .collect();

    servers.sort_by(|(a, la), (b, lb)| {
        time_key(lb)
            .cmp(&time_key(la))
            .then_with(|| a.hostname.cmp(&b.hostname))
            .then_with(|| a.protocol.cmp(&b.protocol))
            .then_with(|| a.drive_model.cmp(&b.drive_model))
    });
    servers.into_iter().map(|(info, _)| info).collect()
}

// ============================================================================
// Listings
// ============================================================================

/// Window into a newest-first run listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Runs per page, `1..=MAX_PAGE_SIZE`
    #[serde(default = "default_page_size")]
    pub limit: usize,
    /// Runs skipped before the page
    #[serde(default)]
    pub offset: usize,
}

fn default_page_size() -> usize {
    50
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: default_page_size(),
            offset: 0,
        }
    }
}

impl PageRequest {
    /// Check the page size bounds
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 || self.limit > MAX_PAGE_SIZE {
            return Err(Error::InvalidPagination(format!(
                "limit must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.limit
            )));
        }
        Ok(())
    }
}

/// One page of runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunPage<'a> {
    /// Runs on this page, newest first
    pub runs: Vec<&'a BenchmarkRun>,
    /// Runs across all pages
    pub total: usize,
    /// 1-based page number, `offset / limit + 1`
    pub page: usize,
    /// Requested page size
    pub per_page: usize,
}

/// Runs ordered newest first; equal timestamps keep their input order
fn newest_first<'a>(records: impl IntoIterator<Item = &'a BenchmarkRun>) -> Vec<&'a BenchmarkRun> {
    let mut runs: Vec<&BenchmarkRun> = records.into_iter().collect();
    runs.sort_by(|a, b| time_key(b).cmp(&time_key(a)));
    runs
}

/// Newest-first page of `records`
pub fn paginate<'a>(records: &[&'a BenchmarkRun], request: &PageRequest) -> Result<RunPage<'a>> {
    request.validate()?;
    let runs: Vec<&BenchmarkRun> = newest_first(records.iter().copied())
        .into_iter()
        .skip(request.offset)
        .take(request.limit)
        .collect();

    debug!(
        total = records.len(),
        returned = runs.len(),
        offset = request.offset,
        "Paginated runs"
    );

    Ok(RunPage {
        runs,
        total: records.len(),
        page: request.offset / request.limit + 1,
        per_page: request.limit,
    })
}

/// Newest-first runs inside `window`, at most `limit` of them
pub fn history<'a>(
    records: &[&'a BenchmarkRun],
    window: TimeWindow,
    limit: usize,
) -> Result<Vec<&'a BenchmarkRun>> {
    if limit == 0 || limit > MAX_HISTORY_LIMIT {
        return Err(Error::InvalidPagination(format!(
            "limit must be between 1 and {}, got {}",
            MAX_HISTORY_LIMIT, limit
        )));
    }
    let mut runs = newest_first(
        records
            .iter()
            .copied()
            .filter(|run| window.contains(run.timestamp_utc())),
    );
    runs.truncate(limit);
    Ok(runs)
}

// ============================================================================
// Latest runs
// ============================================================================

/// Most recent run of every unique configuration
///
/// Output keeps the relative order of the surviving runs in `records`.
/// Between runs with identical timestamps the later one in `records` wins.
pub fn latest_runs<'a>(records: &[&'a BenchmarkRun]) -> Vec<&'a BenchmarkRun> {
    let mut latest: HashMap<String, usize> = HashMap::new();
    for (i, &run) in records.iter().enumerate() {
        latest
            .entry(run.unique_key())
            .and_modify(|best| {
                if time_key(run) >= time_key(records[*best]) {
                    *best = i;
                }
            })
            .or_insert(i);
    }

    let mut keep: Vec<usize> = latest.into_values().collect();
    keep.sort_unstable();
    keep.into_iter().map(|i| records[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::run;

    fn at(id: &str, host: Option<&str>, ts: &str) -> BenchmarkRun {
        let mut r = run(id);
        r.hostname = host.map(str::to_string);
        r.timestamp = ts.to_string();
        r
    }

    #[test]
    fn test_inventory_groups_and_orders() {
        let records = vec![
            at("1", Some("alpha"), "2025-06-01T00:00:00"),
            at("2", Some("alpha"), "2025-06-05T00:00:00"),
            at("3", Some("beta"), "2025-06-03T00:00:00"),
            at("4", None, "2025-06-09T00:00:00"),
        ];
        let refs: Vec<_> = records.iter().collect();
        let servers = server_inventory(&refs);

        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].hostname, "alpha");
        assert_eq!(servers[0].test_count, 2);
        assert_eq!(servers[0].first_test_time, "2025-06-01T00:00:00");
        assert_eq!(servers[0].last_test_time, "2025-06-05T00:00:00");
        assert_eq!(servers[1].hostname, "beta");
    }

    #[test]
    fn test_latest_runs_per_configuration() {
        let mut other_config = at("3", Some("alpha"), "2025-06-01T00:00:00");
        other_config.queue_depth = 1;
        let records = vec![
            at("1", Some("alpha"), "2025-06-05T00:00:00"),
            at("2", Some("alpha"), "2025-06-01T00:00:00"),
            other_config,
        ];
        let refs: Vec<_> = records.iter().collect();
        let latest = latest_runs(&refs);
        let ids: Vec<&str> = latest.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    fn dated_runs() -> Vec<BenchmarkRun> {
        (1..=5)
            .map(|day| at(&day.to_string(), Some("alpha"), &format!("2025-06-0{}T00:00:00", day)))
            .collect()
    }

    #[test]
    fn test_paginate_newest_first() {
        let records = dated_runs();
        let refs: Vec<_> = records.iter().collect();

        let page = paginate(&refs, &PageRequest { limit: 2, offset: 2 }).unwrap();
        let ids: Vec<&str> = page.runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
        assert_eq!((page.total, page.page, page.per_page), (5, 2, 2));

        let past_end = paginate(&refs, &PageRequest { limit: 2, offset: 10 }).unwrap();
        assert!(past_end.runs.is_empty());
        assert_eq!(past_end.total, 5);
    }

    #[test]
    fn test_paginate_rejects_bad_limits() {
        let refs: Vec<&BenchmarkRun> = Vec::new();
        for limit in [0, MAX_PAGE_SIZE + 1] {
            assert!(matches!(
                paginate(&refs, &PageRequest { limit, offset: 0 }),
                Err(Error::InvalidPagination(_))
            ));
        }
        assert!(paginate(&refs, &PageRequest::default()).is_ok());
    }

    #[test]
    fn test_history_window_and_limit() {
        use chrono::{TimeZone, Utc};

        let records = dated_runs();
        let refs: Vec<_> = records.iter().collect();
        let window = TimeWindow::between(
            Some(Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2025, 6, 4, 0, 0, 0).unwrap()),
        );

        let ids = |runs: Vec<&BenchmarkRun>| -> Vec<String> {
            runs.iter().map(|r| r.id.clone()).collect()
        };
        assert_eq!(ids(history(&refs, window, 10).unwrap()), vec!["4", "3", "2"]);
        assert_eq!(ids(history(&refs, window, 1).unwrap()), vec!["4"]);
        assert!(history(&refs, window, 0).is_err());
    }
}
