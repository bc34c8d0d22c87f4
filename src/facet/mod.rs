//! Facet schema
//!
//! A facet is one filterable dimension of a benchmark run. The set of facets
//! is closed, and each facet declares statically whether its values are
//! strings or integers, so selections and counts never mix value types.
//!
//! # Components
//!
//! - [`filter`]: `FilterState`, per-facet predicates and the filtered dataset
//! - [`options`]: single-pass facet option counting

pub mod filter;
pub mod options;

pub use filter::{compute_filtered, compute_filtered_indices, matches, FilterState};
pub use options::{
    compute_options, compute_options_with_mode, FacetCountMode, FacetOption, FacetOptions,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dimension::DimensionKind;
use crate::error::{Error, Result};
use crate::types::BenchmarkRun;

/// Declared value type of a facet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// String-valued facet
    Text,
    /// Integer-valued facet
    Integer,
}

/// Filterable dimension of a benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    /// Drive type (NVMe SSD, SATA SSD, HDD)
    DriveType,
    /// Drive model
    DriveModel,
    /// Read/write pattern
    #[serde(alias = "read_write_pattern")]
    Pattern,
    /// Block size
    BlockSize,
    /// Hostname (optional on runs)
    Hostname,
    /// Protocol (optional on runs)
    Protocol,
    /// Sync flag (optional on runs)
    Sync,
    /// Queue depth
    QueueDepth,
    /// Direct I/O flag (optional on runs)
    Direct,
    /// Number of jobs (optional on runs)
    NumJobs,
    /// Test size (optional on runs)
    TestSize,
    /// Duration in seconds
    Duration,
}

impl Facet {
    /// Every facet, in the order predicates are applied
    pub const ALL: [Facet; 12] = [
        Facet::DriveType,
        Facet::DriveModel,
        Facet::Pattern,
        Facet::BlockSize,
        Facet::Hostname,
        Facet::Protocol,
        Facet::Sync,
        Facet::QueueDepth,
        Facet::Direct,
        Facet::NumJobs,
        Facet::TestSize,
        Facet::Duration,
    ];

    /// Facet name as used in filter payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::DriveType => "drive_type",
            Facet::DriveModel => "drive_model",
            Facet::Pattern => "pattern",
            Facet::BlockSize => "block_size",
            Facet::Hostname => "hostname",
            Facet::Protocol => "protocol",
            Facet::Sync => "sync",
            Facet::QueueDepth => "queue_depth",
            Facet::Direct => "direct",
            Facet::NumJobs => "num_jobs",
            Facet::TestSize => "test_size",
            Facet::Duration => "duration",
        }
    }

    /// Declared value type
    pub fn value_kind(&self) -> ValueKind {
        match self {
            Facet::Sync | Facet::QueueDepth | Facet::Direct | Facet::NumJobs | Facet::Duration => {
                ValueKind::Integer
            },
            _ => ValueKind::Text,
        }
    }

    /// Ordering used for this facet's values
    pub fn dimension_kind(&self) -> DimensionKind {
        match (self, self.value_kind()) {
            (Facet::BlockSize, _) => DimensionKind::BlockSize,
            (_, ValueKind::Integer) => DimensionKind::Numeric,
            (_, ValueKind::Text) => DimensionKind::Text,
        }
    }

    /// Whether runs may lack a value for this facet
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Facet::Hostname
                | Facet::Protocol
                | Facet::Sync
                | Facet::Direct
                | Facet::NumJobs
                | Facet::TestSize
        )
    }

    /// Borrow the run's value for this facet
    pub fn value_of<'a>(&self, run: &'a BenchmarkRun) -> Option<FacetKey<'a>> {
        match self {
            Facet::DriveType => Some(FacetKey::Text(&run.drive_type)),
            Facet::DriveModel => Some(FacetKey::Text(&run.drive_model)),
            Facet::Pattern => Some(FacetKey::Text(&run.read_write_pattern)),
            Facet::BlockSize => Some(FacetKey::Text(&run.block_size)),
            Facet::Hostname => run.hostname.as_deref().map(FacetKey::Text),
            Facet::Protocol => run.protocol.as_deref().map(FacetKey::Text),
            Facet::Sync => run.sync.map(FacetKey::Int),
            Facet::QueueDepth => Some(FacetKey::Int(run.queue_depth)),
            Facet::Direct => run.direct.map(FacetKey::Int),
            Facet::NumJobs => run.num_jobs.map(FacetKey::Int),
            Facet::TestSize => run.test_size.as_deref().map(FacetKey::Text),
            Facet::Duration => Some(FacetKey::Int(run.duration)),
        }
    }

    /// Parse a textual selection value into this facet's value type
    pub fn parse_value(&self, raw: &str) -> Result<FacetValue> {
        let raw = raw.trim();
        let invalid = || Error::InvalidFacetValue {
            facet: self.as_str().to_string(),
            value: raw.to_string(),
        };

        match self.value_kind() {
            ValueKind::Text if raw.is_empty() => Err(invalid()),
            ValueKind::Text => Ok(FacetValue::Text(raw.to_string())),
            ValueKind::Integer => {
                let parsed = match (self, raw) {
                    (Facet::Sync | Facet::Direct, "true") => 1,
                    (Facet::Sync | Facet::Direct, "false") => 0,
                    _ => raw.parse::<i64>().map_err(|_| invalid())?,
                };
                if matches!(self, Facet::Sync | Facet::Direct) && !(0..=1).contains(&parsed) {
                    return Err(invalid());
                }
                Ok(FacetValue::Int(parsed))
            },
        }
    }

    /// Coerce an already-typed value into this facet's value type
    pub fn coerce(&self, value: FacetValue) -> Result<FacetValue> {
        match (self.value_kind(), value) {
            (ValueKind::Text, FacetValue::Int(i)) => Ok(FacetValue::Text(i.to_string())),
            (ValueKind::Text, FacetValue::Text(s)) => self.parse_value(&s),
            (ValueKind::Integer, FacetValue::Int(i)) => self.parse_value(&i.to_string()),
            (ValueKind::Integer, FacetValue::Text(s)) => self.parse_value(&s),
        }
    }

    /// Human-readable label for one of this facet's values
    pub fn label_for(&self, key: &FacetKey<'_>) -> String {
        match (self, key) {
            (Facet::Sync | Facet::Direct, FacetKey::Int(1)) => "Enabled".to_string(),
            (Facet::Sync | Facet::Direct, FacetKey::Int(0)) => "Disabled".to_string(),
            (Facet::QueueDepth, FacetKey::Int(qd)) => format!("QD{}", qd),
            (Facet::Duration, FacetKey::Int(secs)) => format!("{}s", secs),
            _ => key.to_string(),
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facet {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim();
        if name == "read_write_pattern" {
            return Ok(Facet::Pattern);
        }
        Facet::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| Error::UnknownFacet(s.to_string()))
    }
}

// ============================================================================
// Facet values
// ============================================================================

/// Owned facet value, as held in a selection or emitted in an option
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValue {
    /// Integer-valued facet value
    Int(i64),
    /// String-valued facet value
    Text(String),
}

impl FacetValue {
    /// Borrowed view for comparison against run values
    pub fn as_key(&self) -> FacetKey<'_> {
        match self {
            FacetValue::Int(i) => FacetKey::Int(*i),
            FacetValue::Text(s) => FacetKey::Text(s),
        }
    }
}

impl fmt::Display for FacetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_key().fmt(f)
    }
}

impl From<&str> for FacetValue {
    fn from(s: &str) -> Self {
        FacetValue::Text(s.to_string())
    }
}

impl From<i64> for FacetValue {
    fn from(i: i64) -> Self {
        FacetValue::Int(i)
    }
}

/// Borrowed facet value read from a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKey<'a> {
    /// Integer value
    Int(i64),
    /// String value
    Text(&'a str),
}

impl FacetKey<'_> {
    /// Convert to an owned value
    pub fn to_owned_value(&self) -> FacetValue {
        match *self {
            FacetKey::Int(i) => FacetValue::Int(i),
            FacetKey::Text(s) => FacetValue::Text(s.to_string()),
        }
    }
}

impl fmt::Display for FacetKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetKey::Int(i) => write!(f, "{}", i),
            FacetKey::Text(s) => f.write_str(s),
        }
    }
}
