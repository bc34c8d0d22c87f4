//! Error types for the analytics engine
//!
//! The engine functions themselves never fail on data-quality problems
//! (missing optional fields, unparsable block sizes, empty inputs). Errors
//! only surface at the input boundaries: parsing facet, metric and dimension
//! names, coercing textual selections, loading configuration and reading
//! benchmark JSON.

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Facet name outside the fixed facet set
    #[error("Unknown facet: {0}")]
    UnknownFacet(String),

    /// Metric name outside the supported metric set
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Dimension name that is neither a facet nor a synthetic key
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// Selection value that cannot be coerced to the facet's value type
    #[error("Invalid value {value:?} for facet {facet}")]
    InvalidFacetValue {
        /// Facet the value was meant for
        facet: String,
        /// The rejected raw value
        value: String,
    },

    /// Selection assignment without a `facet=values` shape
    #[error("Invalid selection {0:?}: expected facet=value[,value...]")]
    InvalidAssignment(String),

    /// Listing limit or offset out of range
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Configuration(err.to_string())
    }
}

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;
