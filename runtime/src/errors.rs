use thiserror::Error;

/// Errors that can occur while evaluating primitives or touching
/// distributed partitions.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Operand count outside the range accepted by a primitive family
    #[error("{family}: expected {expected} operands, got {actual}")]
    Arity {
        family: String,
        expected: String,
        actual: usize,
    },

    /// Required operand missing or nil, or an operand of the wrong kind
    #[error("{family}: invalid operand: {reason}")]
    InvalidOperand { family: String, reason: String },

    /// Data rank outside 0..=3
    #[error("{family}: unsupported number of dimensions: {rank}")]
    UnsupportedRank { family: String, rank: usize },

    /// Inconsistent slice bounds or an out-of-range site index
    #[error("Range error: {0}")]
    Range(String),

    /// Distributed object constructed with this_site >= site_count
    #[error("Invalid partition: site {this_site} of {site_count} sites")]
    InvalidPartition { this_site: usize, site_count: usize },

    /// No primitive family registered under the given name
    #[error("Unknown primitive: {0}")]
    UnknownPrimitive(String),

    /// Directory (symbolic name service) failure
    #[error("Directory error: {0}")]
    Directory(String),

    /// Remote invocation failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred (config files, log directories)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub(crate) fn arity(family: &str, expected: impl Into<String>, actual: usize) -> Self {
        RuntimeError::Arity {
            family: family.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub(crate) fn invalid_operand(family: &str, reason: impl Into<String>) -> Self {
        RuntimeError::InvalidOperand {
            family: family.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported_rank(family: &str, rank: usize) -> Self {
        RuntimeError::UnsupportedRank {
            family: family.to_string(),
            rank,
        }
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

impl From<toml::ser::Error> for RuntimeError {
    fn from(e: toml::ser::Error) -> Self {
        RuntimeError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RuntimeError {
    fn from(e: toml::de::Error) -> Self {
        RuntimeError::Serialization(e.to_string())
    }
}
