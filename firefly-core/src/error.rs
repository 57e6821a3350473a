//! Error types and result types for model and store operations.
//!
//! Every fallible operation in this crate returns [`StoreResult<T>`]. Absence of a
//! document is never an error: lookups return `None` or an empty vector instead.

use bson::error::Error as BsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when working with models and stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required argument (collection name, id, document, key or value) was missing.
    ///
    /// Raised before any backend call is made.
    #[error("Precondition failed: {0}")]
    Precondition(String),
    /// Serialization/deserialization error when converting between models and documents.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The value handed to a model or store is not a field/value map.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A comparison operator string that no backend understands.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The underlying store call failed. Propagated unchanged to the caller.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Shorthand for a [`StoreError::Precondition`] naming the missing argument.
    pub fn missing(what: &str) -> Self {
        StoreError::Precondition(format!("Need {what} please"))
    }
}

/// A specialized `Result` type for model and store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<BsonError> for StoreError {
    fn from(err: BsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
