//! # Reviews Crate
//!
//! The review write path and everything derived from stored reviews.
//!
//! ## Main Components
//!
//! - **validation**: Turn raw submissions into insertable reviews
//! - **aggregator**: Running rating aggregate and bounded embedded window
//! - **coordinator**: Dual write with transactional and degraded paths
//! - **summary**: Paged review listing and per-item statistics
//! - **reconcile**: Rebuild item aggregates from the review store
//!
//! ## Example Usage
//!
//! ```ignore
//! use reviews::{ReviewSubmission, ReviewWriteCoordinator};
//! use catalog::MemoryStore;
//! use std::sync::Arc;
//!
//! let coordinator = ReviewWriteCoordinator::new(Arc::new(MemoryStore::new()));
//! let review = coordinator
//!     .submit(&ReviewSubmission::new(item_id, user_id, "mei", 5.0, "Great view"))
//!     .await?;
//! ```
//!
//! ## Consistency
//!
//! Every stored review contributes exactly once to its item's rating. On
//! the transactional path the review insert and item update commit as one
//! unit. On the degraded path they are separate writes; see
//! [`coordinator`] for the states a failure can leave behind.

pub mod aggregator;
pub mod coordinator;
pub mod error;
pub mod reconcile;
pub mod summary;
pub mod validation;

pub use aggregator::{DEFAULT_MAX_EMBEDDED, RatingAggregator};
pub use coordinator::{ReviewWriteCoordinator, WritePath};
pub use error::{Result, ReviewError};
pub use reconcile::{ItemReconciliation, ReconcileReport, Reconciler};
pub use summary::{
    DEFAULT_REVIEW_PAGE_SIZE, ReviewPage, ReviewSummary, list_reviews, review_summary,
};
pub use validation::ReviewSubmission;
