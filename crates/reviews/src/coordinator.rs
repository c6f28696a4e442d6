//! Review Write Coordinator - the review dual write
//!
//! A review lives twice: as a record in the review store and as a summary
//! plus aggregate contribution on its item. Both must land together.
//!
//! ## Transactional path (preferred)
//! 1. Open a unit of work
//! 2. Read the item; missing item aborts with `ItemNotFound`
//! 3. Insert the review, apply it to the item, save the item
//! 4. Commit. Any error aborts the unit of work: nothing survives.
//!
//! ## Degraded path
//! Entered once per call when the backend reports that transactions are
//! unsupported (single-node deployments). Never retried as a transaction.
//! 1. Insert the review (durable immediately)
//! 2. Read the item; if missing, delete the review again (best effort,
//!    not verified) and fail with `ItemNotFound`
//! 3. Apply and save the item with no atomicity between the two writes
//!
//! Readers can see the review before the item update in the degraded path,
//! and two concurrent writers on one item can lose an update. If the item
//! save fails, the review stays without its aggregate contribution until
//! [`crate::reconcile`] repairs the item.

use catalog::{NewReview, Review, Store, Transaction};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregator::RatingAggregator;
use crate::error::{Result, ReviewError};
use crate::validation::ReviewSubmission;

/// Which path a successful write took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    Transactional,
    Degraded,
}

pub struct ReviewWriteCoordinator<S: Store + ?Sized> {
    store: Arc<S>,
    aggregator: RatingAggregator,
}

impl<S: Store + ?Sized> ReviewWriteCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            aggregator: RatingAggregator::default(),
        }
    }

    /// Configure the aggregator (embedded window size)
    pub fn with_aggregator(mut self, aggregator: RatingAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn aggregator(&self) -> &RatingAggregator {
        &self.aggregator
    }

    /// Validate and persist a review.
    pub async fn submit(&self, submission: &ReviewSubmission) -> Result<Review> {
        let new_review = submission.validate()?;
        self.write(new_review).await.map(|(review, _)| review)
    }

    /// Persist an already validated review and report the path taken.
    #[instrument(skip(self, review), fields(item_id = review.item_id, user_id = review.user_id))]
    pub async fn write(&self, review: NewReview) -> Result<(Review, WritePath)> {
        let outcome = match self.store.begin().await {
            Ok(tx) => self.write_transactional(tx, review.clone()).await,
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(stored) => {
                info!(review_id = stored.id, "Review committed");
                Ok((stored, WritePath::Transactional))
            }
            Err(ReviewError::Storage(e)) if e.is_transaction_unsupported() => {
                warn!("Transactions unavailable ({}), using degraded write path", e);
                let stored = self.write_degraded(review).await?;
                Ok((stored, WritePath::Degraded))
            }
            Err(e) => Err(e),
        }
    }

    async fn write_transactional(
        &self,
        mut tx: Box<dyn Transaction>,
        review: NewReview,
    ) -> Result<Review> {
        match self.stage(tx.as_mut(), review).await {
            Ok(stored) => match tx.commit().await {
                Ok(()) => Ok(stored),
                Err(e) => {
                    tx.abort().await;
                    Err(e.into())
                }
            },
            Err(e) => {
                debug!("Aborting review transaction: {}", e);
                tx.abort().await;
                Err(e)
            }
        }
    }

    async fn stage(&self, tx: &mut dyn Transaction, review: NewReview) -> Result<Review> {
        let item_id = review.item_id;
        let mut item = tx
            .find_item(item_id)
            .await?
            .ok_or(ReviewError::ItemNotFound(item_id))?;

        let stored = tx.insert_review(review).await?;
        self.aggregator.apply(&mut item, &stored);
        tx.save_item(&item).await?;
        Ok(stored)
    }

    async fn write_degraded(&self, review: NewReview) -> Result<Review> {
        let stored = self.store.insert_review(review).await?;

        let mut item = match self.store.find_item(stored.item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                self.compensate(&stored).await;
                return Err(ReviewError::ItemNotFound(stored.item_id));
            }
            Err(e) => {
                error!(
                    review_id = stored.id,
                    "Review persisted but item lookup failed: {}", e
                );
                return Err(e.into());
            }
        };

        self.aggregator.apply(&mut item, &stored);
        if let Err(e) = self.store.save_item(&item).await {
            error!(
                review_id = stored.id,
                item_id = stored.item_id,
                "Review persisted without item update: {}", e
            );
            return Err(e.into());
        }

        info!(review_id = stored.id, "Review written without transaction");
        Ok(stored)
    }

    /// Best-effort removal of a review whose item vanished.
    async fn compensate(&self, review: &Review) {
        warn!(
            review_id = review.id,
            item_id = review.item_id,
            "Item missing after review insert, removing review"
        );
        match self.store.delete_review(review.id).await {
            Ok(true) => debug!(review_id = review.id, "Orphan review removed"),
            Ok(false) => warn!(review_id = review.id, "Orphan review already gone"),
            Err(e) => error!(
                review_id = review.id,
                "Failed to remove orphan review: {}", e
            ),
        }
    }
}
