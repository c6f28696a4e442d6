//! Error types for the catalog crate.
//!
//! `StoreError` is what every store operation can fail with; `SeedError`
//! covers loading a seed file into the in-memory store.

use thiserror::Error;

use crate::types::{ItemId, ReviewId, UserId};

/// Messages a document database uses when multi-document transactions are
/// requested on a deployment that cannot provide them.
const TRANSACTION_UNSUPPORTED_MARKERS: [&str; 3] = [
    "transaction numbers are only allowed on a replica set member or mongos",
    "transactions are not supported",
    "this deployment does not support transactions",
];

/// Errors raised by the collaborator stores.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The backend cannot run atomic multi-document units of work
    #[error("Transactions are not supported by this deployment")]
    TransactionsUnsupported,

    /// A transaction handle was used after it finished
    #[error("Transaction already finished")]
    TransactionClosed,

    /// Any other backend fault, passed through untouched
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error means "fall back to the non-transactional path".
    ///
    /// Besides the dedicated variant, backend messages are matched so that
    /// adapters which only surface the driver's text are recognised too.
    pub fn is_transaction_unsupported(&self) -> bool {
        match self {
            StoreError::TransactionsUnsupported => true,
            StoreError::Backend(message) => {
                let message = message.to_ascii_lowercase();
                TRANSACTION_UNSUPPORTED_MARKERS
                    .iter()
                    .any(|marker| message.contains(marker))
            }
            StoreError::TransactionClosed => false,
        }
    }
}

/// Convenience type alias for store results
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while loading seed data
#[derive(Error, Debug)]
pub enum SeedError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid seed JSON
    #[error("Parse error in {file}: {reason}")]
    ParseError { file: String, reason: String },

    /// A field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Two records share the same identity
    #[error("Duplicate {entity} with id {id}")]
    DuplicateId { entity: String, id: u64 },

    /// Referenced entity doesn't exist (e.g. review for a non-existent item)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: u64 },
}

impl SeedError {
    pub(crate) fn missing_item(id: ItemId) -> Self {
        SeedError::MissingReference {
            entity: "Item".to_string(),
            id: id as u64,
        }
    }

    pub(crate) fn duplicate(entity: &str, id: u64) -> Self {
        SeedError::DuplicateId {
            entity: entity.to_string(),
            id,
        }
    }

    pub(crate) fn duplicate_review(id: ReviewId) -> Self {
        Self::duplicate("Review", id)
    }

    pub(crate) fn duplicate_user(id: UserId) -> Self {
        Self::duplicate("User", id as u64)
    }
}

/// A category name outside the fixed set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);
