//! Error types for configuring the detector.
//!
//! Only construction can fail. Once built, the pooler, memory and scorer always
//! produce a result for well-formed input; malformed input (a vector of the wrong
//! width, a column index outside the pooler) is a caller bug and panics instead.

use thiserror::Error;

/// Errors raised while building detector components.
#[derive(Error, Debug)]
pub enum HtmError {
    /// A parameter is outside its valid range.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        name: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// The pooler and the memory disagree on the number of columns.
    #[error("Column count mismatch: spatial pooler has {pooler}, temporal memory has {memory}")]
    ColumnMismatch {
        /// Columns in the spatial pooler.
        pooler: usize,
        /// Columns in the temporal memory.
        memory: usize,
    },

    /// The configuration document could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl HtmError {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Result type alias using `HtmError`.
pub type Result<T> = std::result::Result<T, HtmError>;
