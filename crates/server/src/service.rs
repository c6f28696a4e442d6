//! # Marketplace Service
//!
//! The facade the request layer talks to. It wires the shared store into
//! the review write path, the recommendation orchestrator and activity
//! recording, and applies the service configuration.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use catalog::{
    Item, ItemFilter, ItemId, ItemSort, MemoryStore, Page, PageRequest, Preferences,
    PurchaseRecord, Review, Seed, Store, Timestamp, UserId,
};
use pipeline::Recommendation;
use reviews::{
    ItemReconciliation, RatingAggregator, ReconcileReport, Reconciler, ReviewPage,
    ReviewSubmission, ReviewSummary, ReviewWriteCoordinator,
};
use sources::DiversityStrategy;

use crate::activity::{ActivityRecorder, ClickStat, TrainingExport};
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::orchestrator::RecommendationOrchestrator;

pub struct MarketplaceService<S: Store + ?Sized> {
    store: Arc<S>,
    config: ServiceConfig,
    orchestrator: RecommendationOrchestrator<S>,
    coordinator: ReviewWriteCoordinator<S>,
    activity: ActivityRecorder<S>,
}

impl<S: Store + ?Sized> MarketplaceService<S> {
    pub fn new(store: Arc<S>, config: ServiceConfig) -> Self {
        let orchestrator = RecommendationOrchestrator::new(
            store.clone(),
            config.recommendation_size,
            config.click_threshold,
        );
        let coordinator = ReviewWriteCoordinator::new(store.clone())
            .with_aggregator(RatingAggregator::new(config.max_embedded_reviews));
        let activity = ActivityRecorder::new(store.clone());
        Self {
            store,
            config,
            orchestrator,
            coordinator,
            activity,
        }
    }

    /// Swap the preference diversity strategy (default: random shuffle)
    pub fn with_diversity(mut self, diversity: Arc<dyn DiversityStrategy>) -> Self {
        self.orchestrator = self.orchestrator.with_diversity(diversity);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // -------------------------------------------------------------------------
    // Reviews
    // -------------------------------------------------------------------------

    /// Validate and persist a review, updating the item's aggregate.
    ///
    /// Writes slower than the configured budget are logged, never cancelled.
    pub async fn submit_review(&self, submission: &ReviewSubmission) -> Result<Review> {
        let start_time = Instant::now();
        let result = self.coordinator.submit(submission).await;
        let elapsed = start_time.elapsed();
        if elapsed > self.config.write_budget {
            warn!(
                "Review write for item {:?} took {:?}, over the {:?} budget",
                submission.item_id, elapsed, self.config.write_budget
            );
        }
        Ok(result?)
    }

    /// One page of an item's reviews, newest first. `page_size` falls back
    /// to the configured default.
    pub async fn list_reviews(
        &self,
        item_id: ItemId,
        page: usize,
        page_size: Option<usize>,
    ) -> Result<ReviewPage> {
        let request = PageRequest::new(page, page_size.unwrap_or(self.config.review_page_size));
        Ok(reviews::list_reviews(self.store.as_ref(), item_id, request).await?)
    }

    pub async fn review_summary(&self, item_id: ItemId) -> Result<ReviewSummary> {
        Ok(reviews::review_summary(self.store.as_ref(), item_id).await?)
    }

    pub async fn reconcile_item(&self, item_id: ItemId) -> Result<ItemReconciliation> {
        Ok(self.reconciler().reconcile_item(item_id).await?)
    }

    /// Rebuild every item's aggregate from the review store
    pub async fn reconcile_all(&self) -> Result<ReconcileReport> {
        Ok(self.reconciler().reconcile_all().await?)
    }

    fn reconciler(&self) -> Reconciler<S> {
        Reconciler::new(self.store.clone(), *self.coordinator.aggregator())
    }

    // -------------------------------------------------------------------------
    // Recommendations
    // -------------------------------------------------------------------------

    pub async fn get_recommendations(&self, user_id: UserId) -> Result<Vec<Recommendation>> {
        self.orchestrator.get_recommendations(user_id).await
    }

    pub async fn recommendations_or_popular(&self, user_id: UserId) -> Result<Vec<Recommendation>> {
        self.orchestrator.recommendations_or_popular(user_id).await
    }

    pub async fn popular_items(&self, limit: usize) -> Result<Vec<Recommendation>> {
        self.orchestrator.popular_items(limit).await
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// Filtered catalog page, best rated first
    pub async fn browse_items(&self, filter: &ItemFilter, request: PageRequest) -> Result<Page<Item>> {
        let total = self.store.count_items(filter).await?;
        let rows = self
            .store
            .find_items(
                filter,
                ItemSort::RatingThenPurchases,
                request.skip(),
                Some(request.page_size),
            )
            .await?;
        Ok(Page::new(request, total, rows))
    }

    pub async fn get_item(&self, item_id: ItemId) -> Result<Item> {
        self.store
            .find_item(item_id)
            .await?
            .ok_or(ServiceError::ItemNotFound(item_id))
    }

    // -------------------------------------------------------------------------
    // Activity
    // -------------------------------------------------------------------------

    pub async fn record_click(
        &self,
        user_id: UserId,
        item_id: ItemId,
        at: Option<Timestamp>,
    ) -> Result<u32> {
        self.activity.record_click(user_id, item_id, at).await
    }

    pub async fn record_view(
        &self,
        user_id: UserId,
        item_id: ItemId,
        duration_secs: u32,
        at: Option<Timestamp>,
    ) -> Result<()> {
        self.activity
            .record_view(user_id, item_id, duration_secs, at)
            .await
    }

    pub async fn record_purchase(
        &self,
        user_id: UserId,
        item_id: ItemId,
        at: Option<Timestamp>,
    ) -> Result<PurchaseRecord> {
        self.activity.record_purchase(user_id, item_id, at).await
    }

    pub async fn update_preferences(
        &self,
        user_id: UserId,
        preferences: Preferences,
    ) -> Result<Preferences> {
        self.activity.update_preferences(user_id, preferences).await
    }

    pub async fn click_stats(&self, user_id: UserId) -> Result<Vec<ClickStat>> {
        self.activity.click_stats(user_id).await
    }

    pub async fn export_training_data(&self, user_id: UserId) -> Result<TrainingExport> {
        self.activity.export_training_data(user_id).await
    }
}

impl MarketplaceService<MemoryStore> {
    /// Validate a seed, load it into `store` and bring the aggregates of
    /// reviewed items in line with their seeded reviews.
    pub async fn from_seed(seed: Seed, store: MemoryStore, config: ServiceConfig) -> Result<Self> {
        seed.validate()?;
        let reviewed = seed.reviewed_item_ids();
        info!(
            "Seeding store: {} items, {} users, {} reviews",
            seed.items.len(),
            seed.users.len(),
            seed.reviews.len()
        );
        seed.into_store(&store).await;

        let service = Self::new(Arc::new(store), config);
        let mut changed = 0;
        for item_id in reviewed {
            if service.reconcile_item(item_id).await?.changed {
                changed += 1;
            }
        }
        info!("Reconciled {} seeded items from their reviews", changed);
        Ok(service)
    }
}
