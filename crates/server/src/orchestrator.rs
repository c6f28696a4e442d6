//! # Recommendation Orchestrator
//!
//! Coordinates one feed request:
//! 1. Load the user profile and a catalog snapshot (concurrently)
//! 2. Build the user context
//! 3. Rank click-affinity and preference candidates on the blocking pool
//! 4. Assemble the feed (click slots, preference slots, popularity padding)
//! 5. Resolve the feed against the snapshot
//!
//! The snapshot is taken once per request, so both rankers and the
//! assembler see the same catalog.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use catalog::{Catalog, ItemFilter, ItemSort, Store, UserId, UserProfile};
use pipeline::{Recommendation, RecommendationAssembler, resolve_feed};
use sources::{
    ClickAffinitySource, DiversityStrategy, PopularitySource, PreferenceSource, RandomShuffle,
    user_context::build_user_context,
};

use crate::error::{Result, ServiceError};

/// Builds personalized feeds from the shared store.
pub struct RecommendationOrchestrator<S: Store + ?Sized> {
    store: Arc<S>,
    assembler: RecommendationAssembler,
    click_threshold: u32,
    diversity: Arc<dyn DiversityStrategy>,
}

impl<S: Store + ?Sized> RecommendationOrchestrator<S> {
    pub fn new(store: Arc<S>, feed_size: usize, click_threshold: u32) -> Self {
        Self {
            store,
            assembler: RecommendationAssembler::new().with_feed_size(feed_size),
            click_threshold,
            diversity: Arc::new(RandomShuffle),
        }
    }

    /// Swap the preference diversity strategy (default: random shuffle)
    pub fn with_diversity(mut self, diversity: Arc<dyn DiversityStrategy>) -> Self {
        self.diversity = diversity;
        self
    }

    pub fn feed_size(&self) -> usize {
        self.assembler.feed_size()
    }

    /// Main entry point: the user's feed, at most `feed_size` distinct items.
    #[instrument(skip(self))]
    pub async fn get_recommendations(&self, user_id: UserId) -> Result<Vec<Recommendation>> {
        let start_time = Instant::now();

        let (profile, catalog) =
            tokio::try_join!(self.load_profile(user_id), self.load_snapshot())?;
        let profile = profile.ok_or(ServiceError::UserNotFound(user_id))?;

        let context = Arc::new(build_user_context(&profile));
        info!(
            "Built user context for user {}: {} clicked items, {} preferred categories",
            user_id,
            context.clicks.len(),
            context.preferred_categories.len()
        );

        let (click_result, preference_result) = tokio::join!(
            tokio::task::spawn_blocking({
                let source = ClickAffinitySource::new(catalog.clone())
                    .with_min_clicks(self.click_threshold);
                let context = context.clone();
                move || source.get_candidates(&context)
            }),
            tokio::task::spawn_blocking({
                let source =
                    PreferenceSource::new(catalog.clone()).with_diversity(self.diversity.clone());
                let context = context.clone();
                move || source.get_candidates(&context)
            })
        );
        let click = click_result?;
        let preference = preference_result?;
        info!(
            "Generated {} click candidates and {} preference candidates",
            click.len(),
            preference.len()
        );

        let popularity = PopularitySource::new(catalog.clone());
        let (feed, breakdown) = self.assembler.assemble(click, preference, &popularity);
        debug!("Slot breakdown for user {}: {:?}", user_id, breakdown);

        let recommendations = resolve_feed(&catalog, &feed);
        info!(
            "Returning {} recommendations for user {} in {:?}",
            recommendations.len(),
            user_id,
            start_time.elapsed()
        );
        Ok(recommendations)
    }

    /// Global popularity list, the feed anonymous visitors get
    pub async fn popular_items(&self, limit: usize) -> Result<Vec<Recommendation>> {
        let catalog = self.load_snapshot().await?;
        let feed = PopularitySource::new(catalog.clone()).get_candidates(&HashSet::new(), limit);
        Ok(resolve_feed(&catalog, &feed))
    }

    /// The personalized feed, or global popularity for unknown users.
    /// Any other failure still propagates.
    pub async fn recommendations_or_popular(&self, user_id: UserId) -> Result<Vec<Recommendation>> {
        match self.get_recommendations(user_id).await {
            Err(ServiceError::UserNotFound(_)) => {
                warn!(
                    "User {} not found, falling back to popular items",
                    user_id
                );
                self.popular_items(self.feed_size()).await
            }
            other => other,
        }
    }

    async fn load_profile(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        Ok(self.store.find_profile(user_id).await?)
    }

    async fn load_snapshot(&self) -> Result<Arc<Catalog>> {
        let items = self
            .store
            .find_items(&ItemFilter::all(), ItemSort::IdAsc, 0, None)
            .await?;
        debug!("Loaded catalog snapshot with {} items", items.len());
        Ok(Arc::new(Catalog::from_items(items)))
    }
}
