//! Preference Source - catalog items matching stated preferences
//!
//! ## Algorithm
//! 1. Scan the catalog (in parallel) for items whose category is preferred
//!    OR whose tags intersect the preferred tags; an empty preference set
//!    does not filter
//! 2. Sort by rating desc, purchase count desc, creation time desc
//! 3. Keep the top `pool_size` (15) as the pool
//! 4. Pin the first `pinned` (6); let the diversity strategy reorder the rest
//! 5. Return pinned + reordered tail, truncated to `limit` (10)

use catalog::{Catalog, Item, ItemSort};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::diversity::{DiversityStrategy, RandomShuffle};
use crate::types::{Candidate, CandidateSource, UserContext};

pub const DEFAULT_POOL_SIZE: usize = 15;
pub const DEFAULT_PINNED: usize = 6;
pub const DEFAULT_PREFERENCE_LIMIT: usize = 10;

/// Ranks catalog items against a user's preferences
pub struct PreferenceSource {
    catalog: Arc<Catalog>,
    diversity: Arc<dyn DiversityStrategy>,
    pool_size: usize,
    pinned: usize,
    limit: usize,
}

impl PreferenceSource {
    /// Create a source with the random shuffle strategy
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            diversity: Arc::new(RandomShuffle),
            pool_size: DEFAULT_POOL_SIZE,
            pinned: DEFAULT_PINNED,
            limit: DEFAULT_PREFERENCE_LIMIT,
        }
    }

    /// Swap the diversity strategy (tests use `KeepOrder`)
    pub fn with_diversity(mut self, diversity: Arc<dyn DiversityStrategy>) -> Self {
        self.diversity = diversity;
        self
    }

    /// Configure the pool size (default: 15)
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Configure how many top candidates stay in place (default: 6)
    pub fn with_pinned(mut self, pinned: usize) -> Self {
        self.pinned = pinned;
        self
    }

    /// Configure the output size (default: 10)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[instrument(skip(self, user_context), fields(user_id = user_context.user_id))]
    pub fn get_candidates(&self, user_context: &UserContext) -> Vec<Candidate> {
        let mut matching: Vec<&Item> = self
            .catalog
            .par_items()
            .filter(|item| user_context.matches_preferences(item))
            .collect();
        debug!(
            "{} of {} items match preferences",
            matching.len(),
            self.catalog.len()
        );

        matching.sort_by(|a, b| ItemSort::Quality.compare(a, b));
        matching.truncate(self.pool_size);

        let mut candidates: Vec<Candidate> = matching
            .into_iter()
            .map(|item| self.to_candidate(item, user_context))
            .collect();

        let pinned = self.pinned.min(candidates.len());
        for candidate in &mut candidates[..pinned] {
            candidate.metadata.pinned = true;
        }
        self.diversity.diversify(&mut candidates[pinned..]);
        candidates.truncate(self.limit);

        debug!(
            "Generated {} preference candidates ({})",
            candidates.len(),
            self.diversity.name()
        );
        candidates
    }

    fn to_candidate(&self, item: &Item, user_context: &UserContext) -> Candidate {
        let mut candidate = Candidate::new(item.id, CandidateSource::Preference, item.rating as f32);
        candidate.metadata.matched_category = user_context.preferred_categories.contains(&item.category);
        candidate.metadata.matched_tags = item
            .tags
            .intersection(&user_context.preferred_tags)
            .cloned()
            .collect();
        candidate
    }
}
