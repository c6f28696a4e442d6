//! Rating reconciliation.
//!
//! Rebuilds an item's aggregate and embedded window from the review store,
//! which holds every review ever written. This migrates items without
//! running counters and repairs items whose update was lost on the
//! degraded write path. Runs over plain store calls, so it should not race
//! with live review writes for the same item.

use catalog::{
    EmbeddedReviewSummary, Item, ItemFilter, ItemId, ItemSort, ReviewFilter, ReviewSort, Store,
    round2,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::aggregator::RatingAggregator;
use crate::error::{Result, ReviewError};

/// Outcome for one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReconciliation {
    pub item_id: ItemId,
    pub previous_rating: f64,
    pub rating: f64,
    pub review_count: u32,
    /// Whether the stored document had to be rewritten
    pub changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub scanned: usize,
    /// Items that were rewritten
    pub changed: Vec<ItemReconciliation>,
}

pub struct Reconciler<S: Store + ?Sized> {
    store: Arc<S>,
    aggregator: RatingAggregator,
}

impl<S: Store + ?Sized> Reconciler<S> {
    pub fn new(store: Arc<S>, aggregator: RatingAggregator) -> Self {
        Self { store, aggregator }
    }

    #[instrument(skip(self))]
    pub async fn reconcile_item(&self, item_id: ItemId) -> Result<ItemReconciliation> {
        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or(ReviewError::ItemNotFound(item_id))?;
        self.reconcile(item).await
    }

    pub async fn reconcile_all(&self) -> Result<ReconcileReport> {
        let items = self
            .store
            .find_items(&ItemFilter::all(), ItemSort::IdAsc, 0, None)
            .await?;

        let mut report = ReconcileReport {
            scanned: items.len(),
            changed: Vec::new(),
        };
        for item in items {
            let outcome = self.reconcile(item).await?;
            if outcome.changed {
                report.changed.push(outcome);
            }
        }

        info!(
            "Reconciled {} items, {} rewritten",
            report.scanned,
            report.changed.len()
        );
        Ok(report)
    }

    async fn reconcile(&self, item: Item) -> Result<ItemReconciliation> {
        let reviews = self
            .store
            .find_reviews(
                &ReviewFilter::for_item(item.id),
                ReviewSort::Submission,
                0,
                None,
            )
            .await?;

        let count = reviews.len() as u32;
        let sum: u32 = reviews.iter().map(|r| r.rating as u32).sum();
        let window_start = reviews.len().saturating_sub(self.aggregator.max_embedded());

        let mut rebuilt = item.clone();
        rebuilt.rating_sum = Some(sum);
        rebuilt.rating_count = Some(count);
        rebuilt.rating = if count == 0 {
            0.0
        } else {
            round2(sum as f64 / count as f64)
        };
        rebuilt.reviews = reviews[window_start..]
            .iter()
            .map(EmbeddedReviewSummary::from)
            .collect();

        let changed = rebuilt != item;
        if changed {
            self.store.save_item(&rebuilt).await?;
        }

        Ok(ItemReconciliation {
            item_id: item.id,
            previous_rating: item.rating,
            rating: rebuilt.rating,
            review_count: count,
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{Category, ItemStore, MemoryStore, NewReview, ReviewStore, SubRatings};

    fn new_review(item_id: ItemId, rating: u8, at: i64) -> NewReview {
        NewReview {
            item_id,
            user_id: 1,
            user_name: "ana".to_string(),
            rating,
            sub_ratings: SubRatings::default(),
            comment: "ok".to_string(),
            created_at: Some(at),
        }
    }

    #[tokio::test]
    async fn test_migrates_item_without_counters() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_item(
                Item::new(1, "Old Tower", Category::Attraction, 0.0)
                    .without_counters()
                    .with_rating(5.0),
            )
            .await;
        for (at, rating) in [(1, 5), (2, 1), (3, 3)] {
            store.insert_review(new_review(1, rating, at)).await.unwrap();
        }

        let reconciler = Reconciler::new(store.clone(), RatingAggregator::new(2));
        let outcome = reconciler.reconcile_item(1).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.previous_rating, 5.0);
        assert_eq!(outcome.rating, 3.0);

        let item = store.find_item(1).await.unwrap().unwrap();
        assert_eq!(item.rating_sum, Some(9));
        assert_eq!(item.rating_count, Some(3));
        let window: Vec<i64> = item.reviews.iter().map(|r| r.created_at).collect();
        assert_eq!(window, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_backdated_review_keeps_its_window_slot() {
        let store = Arc::new(MemoryStore::new());
        store.insert_item(Item::new(1, "Harbor Inn", Category::Hotel, 90.0)).await;
        let aggregator = RatingAggregator::new(1);

        for (rating, at) in [(4, 100), (2, 50)] {
            let review = store.insert_review(new_review(1, rating, at)).await.unwrap();
            let mut item = store.find_item(1).await.unwrap().unwrap();
            aggregator.apply(&mut item, &review);
            store.save_item(&item).await.unwrap();
        }
        let live = store.find_item(1).await.unwrap().unwrap();
        assert_eq!(live.reviews[0].review_id, 2);

        let outcome = Reconciler::new(store.clone(), aggregator)
            .reconcile_item(1)
            .await
            .unwrap();
        assert!(!outcome.changed);
        assert_eq!(store.find_item(1).await.unwrap().unwrap(), live);
    }

    #[tokio::test]
    async fn test_consistent_items_untouched() {
        let store = Arc::new(MemoryStore::new());
        store.insert_item(Item::new(1, "New Cafe", Category::Food, 5.0)).await;

        let reconciler = Reconciler::new(store.clone(), RatingAggregator::default());
        let report = reconciler.reconcile_all().await.unwrap();
        assert_eq!(report.scanned, 1);
        assert!(report.changed.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let reconciler = Reconciler::new(Arc::new(MemoryStore::new()), RatingAggregator::default());
        assert_eq!(
            reconciler.reconcile_item(5).await.unwrap_err(),
            ReviewError::ItemNotFound(5)
        );
    }
}
