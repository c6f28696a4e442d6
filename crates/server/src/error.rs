//! Errors surfaced by the marketplace service.

use catalog::{ItemId, SeedError, StoreError, UserId};
use reviews::ReviewError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("Invalid seed data: {0}")]
    Seed(#[from] SeedError),

    /// A ranking task on the blocking pool panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::UserNotFound(_) => "USER_NOT_FOUND",
            ServiceError::ItemNotFound(_) => "ITEM_NOT_FOUND",
            ServiceError::ValidationFailed(_) => "VALIDATION_FAILED",
            ServiceError::Review(err) => err.code(),
            ServiceError::Storage(_) => "STORAGE_FAILURE",
            ServiceError::Seed(_) => "VALIDATION_FAILED",
            ServiceError::Task(_) => "INTERNAL",
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
