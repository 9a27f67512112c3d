//! Errors returned by the application facade

use crate::request::RequestId;
use thiserror::Error;
use tourbook_core::Rejection;
use tourbook_runtime::StoreError;

/// Failure of a facade operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The backend or local validation rejected the operation
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The store runtime could not deliver the outcome
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The terminal action did not carry the expected outcome
    #[error("Unexpected outcome for request {0}")]
    UnexpectedOutcome(RequestId),
}
