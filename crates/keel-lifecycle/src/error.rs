//! Lifecycle service error types.

use thiserror::Error;

use keel_state::StateError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("deployment {0} not found")]
    NotFound(String),

    /// Reserved for failures of external dependencies.
    #[error("service {0} is unavailable")]
    Unavailable(String),

    #[error("state store error: {0}")]
    State(StateError),
}

impl From<StateError> for LifecycleError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(id) => LifecycleError::NotFound(id),
            other => LifecycleError::State(other),
        }
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
