use thiserror::Error;

/// Validation and parsing failures for progress values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress update must be a JSON object")]
    NotAnObject,

    #[error("item id cannot be empty")]
    EmptyItemId,

    #[error("value for item `{item}` must be a boolean")]
    NonBooleanValue { item: String },

    #[error("progress document is corrupt: {0}")]
    Corrupt(String),
}
