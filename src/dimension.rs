//! Dimension ordering
//!
//! Axis labels and facet options are ordered by what the values mean, not by
//! their spelling: block sizes by byte count, queue depths numerically, and
//! everything else as plain strings. Unparsable values never fail, they sort
//! with key `0`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::facet::Facet;
use crate::types::BenchmarkRun;

lazy_static! {
    static ref BLOCK_SIZE_RE: Option<Regex> = Regex::new(r"^(\d+)([KM]?)$").ok();
}

/// How the values of a dimension are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    /// Block sizes such as "4K" or "1M", ordered by byte count
    BlockSize,
    /// Intrinsically numeric values (queue depth, duration, flags)
    Numeric,
    /// Plain strings, ordered lexicographically
    Text,
    /// Synthetic `"{pattern} {block_size} QD{queue_depth}"` keys
    Configuration,
}

/// Convert a block size label to bytes
///
/// `K` multiplies by 1024 and `M` by 1024². Anything not matching
/// `^(\d+)([KM]?)$` maps to `0`.
pub fn block_size_bytes(value: &str) -> u64 {
    let Some(caps) = BLOCK_SIZE_RE.as_ref().and_then(|re| re.captures(value)) else {
        return 0;
    };
    let Ok(base) = caps[1].parse::<u64>() else {
        return 0;
    };
    let multiplier = match &caps[2] {
        "K" => 1024,
        "M" => 1024 * 1024,
        _ => 1,
    };
    base.saturating_mul(multiplier)
}

fn numeric_key(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn compare_configuration(a: &str, b: &str) -> Ordering {
    // "{pattern} {block_size} QD{queue_depth}"; the pattern itself has no spaces
    fn split(key: &str) -> (&str, u64, f64) {
        let mut parts = key.rsplitn(3, ' ');
        let qd = parts
            .next()
            .and_then(|p| p.strip_prefix("QD"))
            .map(numeric_key)
            .unwrap_or(0.0);
        let block = parts.next().map(block_size_bytes).unwrap_or(0);
        let pattern = parts.next().unwrap_or("");
        (pattern, block, qd)
    }

    let (pa, ba, qa) = split(a);
    let (pb, bb, qb) = split(b);
    pa.cmp(pb)
        .then(ba.cmp(&bb))
        .then(qa.partial_cmp(&qb).unwrap_or(Ordering::Equal))
}

/// Compare two dimension values
///
/// Values with equal sort keys (e.g. "4K" and "4096") fall back to string
/// order so the result is total and deterministic.
pub fn compare(a: &str, b: &str, kind: DimensionKind) -> Ordering {
    let primary = match kind {
        DimensionKind::BlockSize => block_size_bytes(a).cmp(&block_size_bytes(b)),
        DimensionKind::Numeric => numeric_key(a)
            .partial_cmp(&numeric_key(b))
            .unwrap_or(Ordering::Equal),
        DimensionKind::Text => Ordering::Equal,
        DimensionKind::Configuration => compare_configuration(a, b),
    };
    primary.then_with(|| a.cmp(b))
}

/// Sort dimension values without mutating the input
pub fn sort(values: &[String], kind: DimensionKind) -> Vec<String> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| compare(a, b, kind));
    sorted
}

// ============================================================================
// Dimensions
// ============================================================================

/// An axis a heatmap or chart can be laid out along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dimension {
    /// One of the filterable facets
    Facet(Facet),
    /// `"{pattern} {block_size} QD{queue_depth}"`
    Configuration,
    /// `"{hostname} - {protocol} - {drive_model}"`
    HostDrive,
}

impl Dimension {
    /// Key of a run along this dimension; `None` excludes the run from the axis
    pub fn key_of(&self, run: &BenchmarkRun) -> Option<String> {
        match self {
            Dimension::Facet(facet) => facet.value_of(run).map(|v| v.to_string()),
            Dimension::Configuration => Some(run.configuration_label()),
            Dimension::HostDrive => run.host_drive_label(),
        }
    }

    /// Ordering used for this dimension's labels
    pub fn kind(&self) -> DimensionKind {
        match self {
            Dimension::Facet(facet) => facet.dimension_kind(),
            Dimension::Configuration => DimensionKind::Configuration,
            Dimension::HostDrive => DimensionKind::Text,
        }
    }

    /// Name used on the command line and in serialized requests
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Facet(facet) => facet.as_str(),
            Dimension::Configuration => "configuration",
            Dimension::HostDrive => "host_drive",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "configuration" | "config" => Ok(Dimension::Configuration),
            "host_drive" => Ok(Dimension::HostDrive),
            other => other
                .parse::<Facet>()
                .map(Dimension::Facet)
                .map_err(|_| Error::UnknownDimension(s.to_string())),
        }
    }
}

impl TryFrom<String> for Dimension {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dimension> for String {
    fn from(dimension: Dimension) -> Self {
        dimension.name().to_string()
    }
}

impl From<Facet> for Dimension {
    fn from(facet: Facet) -> Self {
        Dimension::Facet(facet)
    }
}
