//! Error types for unray.

use thiserror::Error;

/// The main error type for unray operations.
///
/// Every error is raised synchronously and aborts the whole compilation it
/// occurred in; no partially applied encoding is ever returned.
#[derive(Error, Debug)]
pub enum UnrayError {
    /// A required channel (`cells` or `coordinates`) has no field.
    #[error("missing required {0} field in the encoding")]
    MissingRequiredChannel(String),

    /// The encoding names a channel that has no handler.
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    /// A channel property is outside its closed set of valid values.
    #[error("invalid value in channel '{channel}': {reason}")]
    InvalidEncodingValue { channel: String, reason: String },

    /// Indicators are restricted to an association space other than cells.
    #[error("indicator space '{0}' is not supported, only cell restriction is implemented")]
    UnsupportedIndicatorSpace(String),

    /// A requested feature exists in the encoding schema but has no implementation.
    #[error("not implemented: {0}")]
    UnimplementedFeature(String),

    /// Non-positive element count given to the texture shape planner.
    #[error("expecting a positive size, got {0}")]
    InvalidSize(usize),

    /// The encoding references a field missing from the data dictionary.
    #[error("field '{0}' not found in data")]
    MissingData(String),

    /// An array length does not match its item size or association space.
    #[error("size mismatch for '{field}': expected {expected}, got {actual}")]
    SizeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// A cell references a vertex outside the point array.
    #[error("cell {cell} references vertex {index}, but there are only {num_points} points")]
    IndexOutOfBounds {
        cell: usize,
        index: i64,
        num_points: usize,
    },

    /// An operation needs mesh data before any update has happened.
    #[error("session has no mesh data - call update() first")]
    NotInitialized,

    /// A resource backend could not hold a requested resource.
    #[error("resource backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl UnrayError {
    pub(crate) fn invalid(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEncodingValue {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// A specialized Result type for unray operations.
pub type Result<T> = std::result::Result<T, UnrayError>;
