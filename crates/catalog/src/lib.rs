//! # Catalog Crate
//!
//! Domain documents of the travel marketplace and the store contracts the
//! rest of the workspace is written against.
//!
//! ## Main Components
//!
//! - **types**: Items, reviews, embedded review summaries, user profiles
//! - **store**: Async store traits (items, reviews, profiles, transactions)
//! - **memory**: In-memory implementation of every store trait
//! - **index**: Read-only catalog snapshot with category/tag indices
//! - **seed**: Load a JSON seed file into the in-memory store
//! - **error**: Error types for stores and seed loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{ItemFilter, ItemSort, ItemStore, MemoryStore, load_seed};
//! use std::path::Path;
//!
//! let store = MemoryStore::new();
//! load_seed(Path::new("data/seed.json"))?.into_store(&store).await;
//!
//! let top = store
//!     .find_items(&ItemFilter::all(), ItemSort::default(), 0, Some(10))
//!     .await?;
//! ```

pub mod error;
pub mod index;
pub mod memory;
pub mod seed;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{SeedError, StoreError, StoreResult, UnknownCategory};
pub use index::Catalog;
pub use memory::{FaultInjector, FaultPoint, MemoryState, MemoryStore};
pub use seed::{Seed, load_seed, parse_seed};
pub use store::{
    ItemFilter, ItemSort, ItemStore, Page, PageRequest, ReviewFilter, ReviewSort, ReviewStore,
    Store, Transaction, Transactional, UserProfileStore,
};
pub use types::{
    // Type aliases
    ItemId,
    ReviewId,
    Timestamp,
    UserId,
    // Core types
    Category,
    ClickRecord,
    EmbeddedReviewSummary,
    Item,
    Location,
    NewReview,
    Preferences,
    PriceRange,
    PurchaseRecord,
    Review,
    SubRatingKind,
    SubRatings,
    UserProfile,
    ViewRecord,
    // Helpers
    now_millis,
    round2,
};
