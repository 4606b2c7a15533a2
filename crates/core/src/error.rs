use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LinkError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad thresholds, empty index fields, etc.).
    ConfigValidation(String),
    /// A referenced field does not exist in the dataset.
    UnknownField { scope: String, field: String },
    /// Comparison vector length differs from the configured comparator count.
    VectorLength { expected: usize, got: usize },
    /// Lower decision threshold is not below the upper threshold.
    ThresholdOrder { lower: f64, upper: f64 },
    /// The same edge was supplied twice with different weights.
    ConflictingEdge { left: u32, right: u32 },
    /// An edge references a record index outside the declared node range.
    InconsistentIds { left: u32, right: u32 },
    /// The run was cancelled between shard boundaries.
    Cancelled,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownField { scope, field } => {
                write!(f, "{scope}: unknown field '{field}'")
            }
            Self::VectorLength { expected, got } => {
                write!(f, "comparison vector has {got} entries, expected {expected}")
            }
            Self::ThresholdOrder { lower, upper } => {
                write!(f, "lower threshold {lower} must be below upper threshold {upper}")
            }
            Self::ConflictingEdge { left, right } => {
                write!(f, "edge ({left},{right}) supplied twice with conflicting weights")
            }
            Self::InconsistentIds { left, right } => {
                write!(f, "edge ({left},{right}) is outside the declared id spaces")
            }
            Self::Cancelled => write!(f, "run cancelled"),
        }
    }
}

impl std::error::Error for LinkError {}
