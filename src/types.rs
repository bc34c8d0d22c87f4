//! Core data types for benchmark analytics

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One FIO test result as supplied by the data layer
///
/// Field names match the JSON payload exactly. Records are read-only to the
/// engine; every derived structure borrows them instead of cloning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    /// Run identity (numeric or UUID in the source data)
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,

    /// Execution timestamp as recorded by the data layer
    pub timestamp: String,

    /// Server hostname
    #[serde(default)]
    pub hostname: Option<String>,

    /// Storage protocol (Local, iSCSI, NFS, ...)
    #[serde(default)]
    pub protocol: Option<String>,

    /// Drive model name
    pub drive_model: String,

    /// Drive type (NVMe SSD, SATA SSD, HDD, ...)
    pub drive_type: String,

    /// Block size, e.g. "4K" or "1M"; numeric byte counts are kept as digits
    #[serde(deserialize_with = "de::string_or_number")]
    pub block_size: String,

    /// I/O pattern (read, write, randread, randwrite, ...)
    pub read_write_pattern: String,

    /// I/O queue depth
    pub queue_depth: i64,

    /// Number of parallel jobs
    #[serde(default)]
    pub num_jobs: Option<i64>,

    /// Sync flag (0 or 1)
    #[serde(default, deserialize_with = "de::optional_flag")]
    pub sync: Option<i64>,

    /// Direct I/O flag (0 or 1)
    #[serde(default, deserialize_with = "de::optional_flag")]
    pub direct: Option<i64>,

    /// Test file size, e.g. "10G"
    #[serde(default, deserialize_with = "de::optional_string_or_number")]
    pub test_size: Option<String>,

    /// Test duration in seconds
    pub duration: i64,

    /// IOPS
    #[serde(default)]
    pub iops: Option<f64>,

    /// Average latency in ms
    #[serde(default)]
    pub avg_latency: Option<f64>,

    /// Bandwidth in MB/s
    #[serde(default)]
    pub bandwidth: Option<f64>,

    /// 95th percentile latency in ms
    #[serde(default)]
    pub p95_latency: Option<f64>,

    /// 99th percentile latency in ms
    #[serde(default)]
    pub p99_latency: Option<f64>,
}

impl BenchmarkRun {
    /// Parse the run timestamp, if it is in a recognised format
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Value of a metric, `None` when absent or not a finite number
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        let value = match metric {
            Metric::Iops => self.iops,
            Metric::AvgLatency => self.avg_latency,
            Metric::Bandwidth => self.bandwidth,
            Metric::P95Latency => self.p95_latency,
            Metric::P99Latency => self.p99_latency,
        };
        value.filter(|v| v.is_finite())
    }

    /// Synthetic configuration key `"{pattern} {block_size} QD{queue_depth}"`
    pub fn configuration_label(&self) -> String {
        format!(
            "{} {} QD{}",
            self.read_write_pattern, self.block_size, self.queue_depth
        )
    }

    /// `"{hostname} - {protocol} - {drive_model}"`, when host and protocol are known
    pub fn host_drive_label(&self) -> Option<String> {
        match (&self.hostname, &self.protocol) {
            (Some(host), Some(protocol)) => {
                Some(format!("{} - {} - {}", host, protocol, self.drive_model))
            },
            _ => None,
        }
    }

    /// Key identifying one benchmark configuration across repeated runs
    ///
    /// Absent optional fields contribute an empty segment, so two runs that
    /// both lack a hostname still share a key.
    pub fn unique_key(&self) -> String {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map(|x| x.to_string()).unwrap_or_default()
        }

        [
            opt(&self.hostname),
            opt(&self.protocol),
            self.drive_type.clone(),
            self.drive_model.clone(),
            self.block_size.clone(),
            self.read_write_pattern.clone(),
            self.queue_depth.to_string(),
            opt(&self.num_jobs),
            opt(&self.direct),
            opt(&self.test_size),
            opt(&self.sync),
        ]
        .join("|")
    }
}

/// Parse the timestamp formats produced by the import pipeline
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.f]`, `YYYY-MM-DD HH:MM:SS[.f]`
/// (both read as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Metrics
// ============================================================================

/// Performance metric carried by a benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// I/O operations per second
    Iops,
    /// Average latency
    AvgLatency,
    /// Bandwidth
    Bandwidth,
    /// 95th percentile latency
    P95Latency,
    /// 99th percentile latency
    P99Latency,
}

impl Metric {
    /// All supported metrics
    pub const ALL: [Metric; 5] = [
        Metric::Iops,
        Metric::AvgLatency,
        Metric::Bandwidth,
        Metric::P95Latency,
        Metric::P99Latency,
    ];

    /// Field name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Iops => "iops",
            Metric::AvgLatency => "avg_latency",
            Metric::Bandwidth => "bandwidth",
            Metric::P95Latency => "p95_latency",
            Metric::P99Latency => "p99_latency",
        }
    }

    /// Unit of measurement
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Iops => "IOPS",
            Metric::AvgLatency | Metric::P95Latency | Metric::P99Latency => "ms",
            Metric::Bandwidth => "MB/s",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownMetric(s.to_string()))
    }
}

// ============================================================================
// Deserialization helpers
// ============================================================================

mod de {
    use serde::de::{self, Deserializer};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Int(i64),
        Float(f64),
    }

    impl StringOrNumber {
        fn into_string(self) -> String {
            match self {
                StringOrNumber::String(s) => s,
                StringOrNumber::Int(i) => i.to_string(),
                StringOrNumber::Float(f) => f.to_string(),
            }
        }
    }

    pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
    }

    pub fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(|x| x.into_string()))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    /// Accepts `0`/`1`, `true`/`false` or null
    pub fn optional_flag<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Flag>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Flag::Bool(b)) => Ok(Some(i64::from(b))),
            Some(Flag::Int(i)) if i == 0 || i == 1 => Ok(Some(i)),
            Some(Flag::Int(i)) => Err(de::Error::custom(format!(
                "flag must be 0 or 1, got {}",
                i
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal run used across unit tests
    pub(crate) fn run(id: &str) -> BenchmarkRun {
        BenchmarkRun {
            id: id.to_string(),
            timestamp: "2025-06-01T10:00:00".to_string(),
            hostname: Some("server1".to_string()),
            protocol: Some("Local".to_string()),
            drive_model: "Samsung 980".to_string(),
            drive_type: "NVMe SSD".to_string(),
            block_size: "4K".to_string(),
            read_write_pattern: "randread".to_string(),
            queue_depth: 32,
            num_jobs: Some(1),
            sync: Some(0),
            direct: Some(1),
            test_size: Some("10G".to_string()),
            duration: 60,
            iops: Some(100.0),
            avg_latency: Some(0.5),
            bandwidth: Some(400.0),
            p95_latency: None,
            p99_latency: None,
        }
    }

    #[test]
    fn test_deserialize_flexible_fields() {
        let json = r#"{
            "id": 42,
            "timestamp": "2025-06-01 10:00:00",
            "drive_model": "WD Red",
            "drive_type": "HDD",
            "block_size": 4096,
            "read_write_pattern": "write",
            "queue_depth": 1,
            "sync": true,
            "direct": 0,
            "test_size": 1024,
            "duration": 30,
            "iops": null
        }"#;
        let run: BenchmarkRun = serde_json::from_str(json).unwrap();
        assert_eq!(run.id, "42");
        assert_eq!(run.block_size, "4096");
        assert_eq!(run.sync, Some(1));
        assert_eq!(run.direct, Some(0));
        assert_eq!(run.test_size.as_deref(), Some("1024"));
        assert_eq!(run.hostname, None);
        assert_eq!(run.iops, None);
    }

    #[test]
    fn test_flag_out_of_range_rejected() {
        let json = r#"{"id":"a","timestamp":"t","drive_model":"m","drive_type":"t",
            "block_size":"4K","read_write_pattern":"read","queue_depth":1,
            "duration":1,"sync":2}"#;
        assert!(serde_json::from_str::<BenchmarkRun>(json).is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(parse_timestamp("2025-06-01T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-01T12:00:00+02:00"), Some(expected));
        assert!(parse_timestamp("2025-06-01T10:00:00.250").is_some());
        assert!(parse_timestamp("2025-06-01").is_some());
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_metric_parse_and_units() {
        assert_eq!("iops".parse::<Metric>().unwrap(), Metric::Iops);
        assert_eq!("P99_LATENCY".parse::<Metric>().unwrap(), Metric::P99Latency);
        assert!("throughput".parse::<Metric>().is_err());
        assert_eq!(Metric::Bandwidth.unit(), "MB/s");
        assert_eq!(Metric::P95Latency.unit(), "ms");
    }

    #[test]
    fn test_labels_and_keys() {
        let mut r = run("1");
        assert_eq!(r.configuration_label(), "randread 4K QD32");
        assert_eq!(
            r.host_drive_label().as_deref(),
            Some("server1 - Local - Samsung 980")
        );
        let key = r.unique_key();
        r.hostname = None;
        assert_eq!(r.host_drive_label(), None);
        assert_ne!(r.unique_key(), key);
        assert!(r.unique_key().starts_with("|Local|"));
    }

    #[test]
    fn test_metric_ignores_non_finite() {
        let mut r = run("1");
        r.iops = Some(f64::NAN);
        assert_eq!(r.metric(Metric::Iops), None);
        assert_eq!(r.metric(Metric::Bandwidth), Some(400.0));
    }
}
