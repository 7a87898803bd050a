//! Error types for the deployment store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("deployment {0} not found")]
    NotFound(String),

    #[error("deployment id {0} already exists")]
    Conflict(String),
}
