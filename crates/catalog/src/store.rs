//! Collaborator store contracts.
//!
//! The core never talks to a database directly; it goes through these
//! traits. Every operation is an async I/O boundary.

use async_trait::async_trait;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::error::StoreResult;
use crate::types::{Category, Item, ItemId, NewReview, Review, ReviewId, UserId, UserProfile};

// =============================================================================
// Item queries
// =============================================================================

/// Conjunctive item filter. Unset fields don't restrict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    /// Category must be one of these (when non-empty)
    pub categories: BTreeSet<Category>,
    /// Item must carry at least one of these tags (when non-empty)
    pub tags_any: BTreeSet<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub city: Option<String>,
    /// Case-insensitive literal match on name or description
    pub text: Option<String>,
    pub exclude_ids: BTreeSet<ItemId>,
}

impl ItemFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.categories.insert(category);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags_any.insert(tag.into());
        self
    }

    pub fn price_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn excluding<I: IntoIterator<Item = ItemId>>(mut self, ids: I) -> Self {
        self.exclude_ids.extend(ids);
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        if self.exclude_ids.contains(&item.id) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&item.category) {
            return false;
        }
        if !self.tags_any.is_empty() && self.tags_any.is_disjoint(&item.tags) {
            return false;
        }
        if self.min_price.is_some_and(|min| item.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| item.price > max) {
            return false;
        }
        if let Some(city) = &self.city {
            if &item.location.city != city {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !item.name.to_lowercase().contains(&needle)
                && !item.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Sort orders the item store understands. All break final ties by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemSort {
    /// Rating desc, then purchase counter desc (catalog listing order)
    #[default]
    RatingThenPurchases,
    /// Rating desc, then review count desc (global popularity)
    RatingThenReviews,
    /// Rating desc, purchase counter desc, creation time desc
    Quality,
    IdAsc,
}

impl ItemSort {
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let by_rating = || b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal);
        let ordering = match self {
            ItemSort::RatingThenPurchases => {
                by_rating().then_with(|| b.purchase_count.cmp(&a.purchase_count))
            }
            ItemSort::RatingThenReviews => {
                by_rating().then_with(|| b.review_count().cmp(&a.review_count()))
            }
            ItemSort::Quality => by_rating()
                .then_with(|| b.purchase_count.cmp(&a.purchase_count))
                .then_with(|| b.created_at.cmp(&a.created_at)),
            ItemSort::IdAsc => Ordering::Equal,
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    }
}

// =============================================================================
// Review queries
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub item_id: Option<ItemId>,
    pub user_id: Option<UserId>,
}

impl ReviewFilter {
    pub fn for_item(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            user_id: None,
        }
    }

    pub fn by_user(user_id: UserId) -> Self {
        Self {
            item_id: None,
            user_id: Some(user_id),
        }
    }

    pub fn matches(&self, review: &Review) -> bool {
        self.item_id.is_none_or(|id| review.item_id == id)
            && self.user_id.is_none_or(|id| review.user_id == id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewSort {
    #[default]
    NewestFirst,
    OldestFirst,
    /// Insertion order, whatever the timestamps say
    Submission,
}

impl ReviewSort {
    pub fn compare(&self, a: &Review, b: &Review) -> Ordering {
        match self {
            ReviewSort::NewestFirst => b
                .created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id)),
            ReviewSort::OldestFirst => a
                .created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id)),
            ReviewSort::Submission => a.id.cmp(&b.id),
        }
    }
}

// =============================================================================
// Paging
// =============================================================================

/// 1-based page request. Page 0 reads as page 1; page size is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn skip(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of rows plus the total row count of the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub rows: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, total: usize, rows: Vec<T>) -> Self {
        Self {
            total,
            page: request.page,
            page_size: request.page_size,
            rows,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size)
    }
}

// =============================================================================
// Store traits
// =============================================================================

/// Holds catalog items.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn find_item(&self, id: ItemId) -> StoreResult<Option<Item>>;

    async fn find_items(
        &self,
        filter: &ItemFilter,
        sort: ItemSort,
        skip: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Item>>;

    /// Insert or replace the item document
    async fn save_item(&self, item: &Item) -> StoreResult<()>;

    async fn count_items(&self, filter: &ItemFilter) -> StoreResult<usize>;
}

/// Normalized, append-only review collection.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert a review, assigning its id and resolving the default timestamp
    async fn insert_review(&self, review: NewReview) -> StoreResult<Review>;

    async fn find_reviews(
        &self,
        filter: &ReviewFilter,
        sort: ReviewSort,
        skip: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Review>>;

    async fn count_reviews(&self, filter: &ReviewFilter) -> StoreResult<usize>;

    /// Remove a review. Only used for best-effort compensation.
    /// Returns whether a review was removed.
    async fn delete_review(&self, id: ReviewId) -> StoreResult<bool>;
}

/// Holds user profiles.
#[async_trait]
pub trait UserProfileStore: Send + Sync {
    async fn find_profile(&self, id: UserId) -> StoreResult<Option<UserProfile>>;

    async fn save_profile(&self, profile: &UserProfile) -> StoreResult<()>;
}

/// An atomic unit of work over items and reviews.
///
/// Nothing becomes visible to other readers until [`Transaction::commit`]
/// succeeds. Dropping an uncommitted transaction aborts it.
#[async_trait]
pub trait Transaction: Send {
    async fn find_item(&mut self, id: ItemId) -> StoreResult<Option<Item>>;

    async fn insert_review(&mut self, review: NewReview) -> StoreResult<Review>;

    async fn save_item(&mut self, item: &Item) -> StoreResult<()>;

    async fn commit(&mut self) -> StoreResult<()>;

    /// Discard all staged writes.
    async fn abort(&mut self);
}

/// Storage transaction capability.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// Open a unit of work, or fail with
    /// [`StoreError::TransactionsUnsupported`](crate::StoreError::TransactionsUnsupported)
    /// on deployments that cannot provide one.
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;
}

/// Everything the marketplace core needs from its storage backend.
pub trait Store: ItemStore + ReviewStore + UserProfileStore + Transactional {}

impl<T> Store for T where T: ItemStore + ReviewStore + UserProfileStore + Transactional {}
