//! Error types for the review write path.

use catalog::{ItemId, StoreError};
use thiserror::Error;

/// What a review operation can fail with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReviewError {
    /// Bad caller input; nothing was written
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    /// Backend fault, passed through unchanged
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ReviewError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ReviewError::ValidationFailed(reason.into())
    }

    /// Stable error code for outer layers
    pub fn code(&self) -> &'static str {
        match self {
            ReviewError::ValidationFailed(_) => "VALIDATION_FAILED",
            ReviewError::ItemNotFound(_) => "ITEM_NOT_FOUND",
            ReviewError::Storage(_) => "STORAGE_FAILURE",
        }
    }
}

/// Convenience type alias for review results
pub type Result<T> = std::result::Result<T, ReviewError>;
