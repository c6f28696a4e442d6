//! In-memory document store.
//!
//! Implements every store trait over one shared state. A transaction holds
//! the state lock for its whole lifetime and stages its writes, so units of
//! work are serialised and invisible until commit. Plain store calls lock
//! per operation only.
//!
//! The store can run in single-node mode, where [`Transactional::begin`]
//! fails with [`StoreError::TransactionsUnsupported`], and carries a
//! [`FaultInjector`] for exercising failure paths.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    ItemFilter, ItemSort, ItemStore, ReviewFilter, ReviewSort, ReviewStore, Transaction,
    Transactional, UserProfileStore,
};
use crate::types::{Item, ItemId, NewReview, Review, ReviewId, UserId, UserProfile};

/// The documents held by a [`MemoryStore`].
#[derive(Debug, Default, Clone, Serialize)]
pub struct MemoryState {
    pub items: BTreeMap<ItemId, Item>,
    pub reviews: BTreeMap<ReviewId, Review>,
    pub profiles: BTreeMap<UserId, UserProfile>,
    last_review_id: ReviewId,
}

impl MemoryState {
    fn next_review_id(&self, pending: usize) -> ReviewId {
        self.last_review_id + pending as ReviewId + 1
    }

    fn put_review(&mut self, review: Review) {
        self.last_review_id = self.last_review_id.max(review.id);
        self.reviews.insert(review.id, review);
    }
}

/// Operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    ItemSave,
    ReviewInsert,
    ReviewDelete,
}

/// Arms a number of upcoming failures per operation.
#[derive(Debug, Default)]
pub struct FaultInjector {
    item_saves: AtomicU32,
    review_inserts: AtomicU32,
    review_deletes: AtomicU32,
}

impl FaultInjector {
    /// Make the next `times` calls of `point` fail with a backend error.
    pub fn fail_next(&self, point: FaultPoint, times: u32) {
        self.counter(point).store(times, Ordering::SeqCst);
    }

    fn counter(&self, point: FaultPoint) -> &AtomicU32 {
        match point {
            FaultPoint::ItemSave => &self.item_saves,
            FaultPoint::ReviewInsert => &self.review_inserts,
            FaultPoint::ReviewDelete => &self.review_deletes,
        }
    }

    fn check(&self, point: FaultPoint) -> StoreResult<()> {
        let armed = self
            .counter(point)
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            Err(StoreError::Backend(format!("injected {point:?} failure")))
        } else {
            Ok(())
        }
    }
}

/// Shared in-memory implementation of all collaborator stores.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    transactions: bool,
    faults: Arc<FaultInjector>,
}

impl MemoryStore {
    /// A store that supports transactions (replicated deployment).
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            transactions: true,
            faults: Arc::new(FaultInjector::default()),
        }
    }

    /// A store that rejects transactions (single-node deployment).
    pub fn single_node() -> Self {
        Self::new().with_transactions(false)
    }

    pub fn with_transactions(mut self, enabled: bool) -> Self {
        self.transactions = enabled;
        self
    }

    pub fn supports_transactions(&self) -> bool {
        self.transactions
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Insert an item as catalog management would.
    pub async fn insert_item(&self, item: Item) {
        self.state.lock().await.items.insert(item.id, item);
    }

    pub async fn insert_profile(&self, profile: UserProfile) {
        self.state.lock().await.profiles.insert(profile.id, profile);
    }

    /// Insert an already-identified review, e.g. from a seed file.
    pub async fn insert_existing_review(&self, review: Review) {
        self.state.lock().await.put_review(review);
    }

    /// Copy of every document, for inspection and comparisons.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn page<T>(rows: Vec<T>, skip: usize, limit: Option<usize>) -> Vec<T> {
    let rows = rows.into_iter().skip(skip);
    match limit {
        Some(limit) => rows.take(limit).collect(),
        None => rows.collect(),
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn find_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.state.lock().await.items.get(&id).cloned())
    }

    async fn find_items(
        &self,
        filter: &ItemFilter,
        sort: ItemSort,
        skip: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Item>> {
        let mut rows: Vec<Item> = {
            let state = self.state.lock().await;
            state
                .items
                .values()
                .filter(|item| filter.matches(item))
                .cloned()
                .collect()
        };
        rows.sort_by(|a, b| sort.compare(a, b));
        Ok(page(rows, skip, limit))
    }

    async fn save_item(&self, item: &Item) -> StoreResult<()> {
        self.faults.check(FaultPoint::ItemSave)?;
        self.state.lock().await.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn count_items(&self, filter: &ItemFilter) -> StoreResult<usize> {
        let state = self.state.lock().await;
        Ok(state.items.values().filter(|item| filter.matches(item)).count())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        self.faults.check(FaultPoint::ReviewInsert)?;
        let mut state = self.state.lock().await;
        let review = review.into_review(state.next_review_id(0));
        state.put_review(review.clone());
        Ok(review)
    }

    async fn find_reviews(
        &self,
        filter: &ReviewFilter,
        sort: ReviewSort,
        skip: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Review>> {
        let mut rows: Vec<Review> = {
            let state = self.state.lock().await;
            state
                .reviews
                .values()
                .filter(|review| filter.matches(review))
                .cloned()
                .collect()
        };
        rows.sort_by(|a, b| sort.compare(a, b));
        Ok(page(rows, skip, limit))
    }

    async fn count_reviews(&self, filter: &ReviewFilter) -> StoreResult<usize> {
        let state = self.state.lock().await;
        Ok(state.reviews.values().filter(|r| filter.matches(r)).count())
    }

    async fn delete_review(&self, id: ReviewId) -> StoreResult<bool> {
        self.faults.check(FaultPoint::ReviewDelete)?;
        Ok(self.state.lock().await.reviews.remove(&id).is_some())
    }
}

#[async_trait]
impl UserProfileStore for MemoryStore {
    async fn find_profile(&self, id: UserId) -> StoreResult<Option<UserProfile>> {
        Ok(self.state.lock().await.profiles.get(&id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        self.state
            .lock()
            .await
            .profiles
            .insert(profile.id, profile.clone());
        Ok(())
    }
}

#[async_trait]
impl Transactional for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        if !self.transactions {
            return Err(StoreError::TransactionsUnsupported);
        }
        let guard = Arc::clone(&self.state).lock_owned().await;
        debug!("memory transaction opened");
        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            staged_items: BTreeMap::new(),
            staged_reviews: Vec::new(),
            faults: Arc::clone(&self.faults),
        }))
    }
}

/// Unit of work holding the store lock until commit or abort.
struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    staged_items: BTreeMap<ItemId, Item>,
    staged_reviews: Vec<Review>,
    faults: Arc<FaultInjector>,
}

impl MemoryTransaction {
    fn state(&self) -> StoreResult<&MemoryState> {
        self.guard.as_deref().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn find_item(&mut self, id: ItemId) -> StoreResult<Option<Item>> {
        if let Some(item) = self.staged_items.get(&id) {
            return Ok(Some(item.clone()));
        }
        Ok(self.state()?.items.get(&id).cloned())
    }

    async fn insert_review(&mut self, review: NewReview) -> StoreResult<Review> {
        self.faults.check(FaultPoint::ReviewInsert)?;
        let id = self.state()?.next_review_id(self.staged_reviews.len());
        let review = review.into_review(id);
        self.staged_reviews.push(review.clone());
        Ok(review)
    }

    async fn save_item(&mut self, item: &Item) -> StoreResult<()> {
        self.state()?;
        self.faults.check(FaultPoint::ItemSave)?;
        self.staged_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let mut guard = self.guard.take().ok_or(StoreError::TransactionClosed)?;
        for review in self.staged_reviews.drain(..) {
            guard.put_review(review);
        }
        for (id, item) in std::mem::take(&mut self.staged_items) {
            guard.items.insert(id, item);
        }
        debug!("memory transaction committed");
        Ok(())
    }

    async fn abort(&mut self) {
        self.staged_items.clear();
        self.staged_reviews.clear();
        if self.guard.take().is_some() {
            debug!("memory transaction aborted");
        }
    }
}
