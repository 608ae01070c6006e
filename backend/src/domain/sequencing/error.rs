//! Failure taxonomy of sequencing operations.

use serde_json::json;

use crate::domain::Error;
use crate::domain::ports::{SequenceStoreError, define_port_error};

define_port_error! {
    /// Why a sequencing operation did not commit.
    ///
    /// Every variant leaves the store exactly as it was before the call.
    pub enum SequenceError {
        /// The referenced item or scope does not exist.
        NotFound { what: String } => "{what} not found",
        /// The request is malformed for the target list or item state.
        InvalidRequest { message: String } => "invalid sequencing request: {message}",
        /// The transaction lost a race with a concurrent writer; retrying
        /// may succeed.
        Conflict { message: String } => "concurrent modification: {message}",
        /// The store was unreachable or aborted for infrastructure reasons.
        StorageFailure { message: String } => "sequence storage failed: {message}",
    }
}

impl SequenceError {
    /// Whether a caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<SequenceStoreError> for SequenceError {
    fn from(error: SequenceStoreError) -> Self {
        match error {
            SequenceStoreError::Conflict { message } => Self::conflict(message),
            other => Self::storage_failure(other.to_string()),
        }
    }
}

impl From<SequenceError> for Error {
    fn from(error: SequenceError) -> Self {
        let retryable = error.is_retryable();
        match error {
            SequenceError::NotFound { what } => Error::not_found(format!("{what} not found")),
            SequenceError::InvalidRequest { message } => Error::invalid_request(message),
            SequenceError::Conflict { message } => Error::conflict(format!(
                "concurrent modification: {message}"
            ))
            .with_details(json!({ "retryable": retryable })),
            SequenceError::StorageFailure { message } => Error::service_unavailable(message),
        }
    }
}
