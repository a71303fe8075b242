//! Tokenizer error type.

use std::error::Error as StdError;

/// The one domain error for markup deserialization.
///
/// Carries the stream position at the point of failure; lower-layer
/// failures (stream I/O) travel along as `cause`.
#[derive(Debug, thiserror::Error)]
#[error("{message} at line {line}, column {column} (offset {index})")]
pub struct DeserializationError {
    /// What went wrong.
    pub message: String,
    /// Character offset at the point of failure.
    pub index: usize,
    /// 1-based line at the point of failure.
    pub line: usize,
    /// 1-based column at the point of failure.
    pub column: usize,
    /// Lower-layer failure, when one triggered this error.
    #[source]
    pub cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl DeserializationError {
    /// Create a domain error at the given stream position.
    pub fn new(message: impl Into<String>, index: usize, line: usize, column: usize) -> Self {
        DeserializationError {
            message: message.into(),
            index,
            line,
            column,
            cause: None,
        }
    }

    /// Wrap a lower-layer failure at the given stream position.
    pub fn wrap<E>(cause: E, index: usize, line: usize, column: usize) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        DeserializationError {
            message: "underlying read failed".into(),
            index,
            line,
            column,
            cause: Some(cause.into()),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DeserializationError>;
