//! Click Affinity Source - items the user keeps coming back to
//!
//! ## Algorithm
//! 1. Keep click-history entries clicked at least `min_clicks` times (3)
//! 2. Sort by click count desc, ties by most recent click desc, then id
//! 3. Take the top `limit` (5)
//! 4. Drop ids that are no longer in the catalog (not replaced)
//!
//! The ranking is decided before catalog resolution, so a missing item
//! shortens the list instead of letting a weaker click through.

use catalog::Catalog;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::types::{Candidate, CandidateSource, UserContext};

/// Default click threshold
pub const DEFAULT_MIN_CLICKS: u32 = 3;

/// Default number of click candidates
pub const DEFAULT_CLICK_LIMIT: usize = 5;

/// Ranks a user's frequently clicked items
pub struct ClickAffinitySource {
    catalog: Arc<Catalog>,

    /// Minimum clicks for an item to count as an affinity
    min_clicks: u32,

    limit: usize,
}

impl ClickAffinitySource {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            min_clicks: DEFAULT_MIN_CLICKS,
            limit: DEFAULT_CLICK_LIMIT,
        }
    }

    /// Configure the click threshold (default: 3)
    pub fn with_min_clicks(mut self, min_clicks: u32) -> Self {
        self.min_clicks = min_clicks;
        self
    }

    /// Configure how many items to return (default: 5)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[instrument(skip(self, user_context), fields(user_id = user_context.user_id))]
    pub fn get_candidates(&self, user_context: &UserContext) -> Vec<Candidate> {
        let mut frequent: Vec<_> = user_context
            .clicks
            .iter()
            .filter(|(_, record)| record.count >= self.min_clicks)
            .collect();
        debug!(
            "{} of {} clicked items reach {} clicks",
            frequent.len(),
            user_context.clicks.len(),
            self.min_clicks
        );

        frequent.sort_by(|(a_id, a), (b_id, b)| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.last_click_at.cmp(&a.last_click_at))
                .then_with(|| a_id.cmp(b_id))
        });
        frequent.truncate(self.limit);

        let candidates: Vec<Candidate> = frequent
            .into_iter()
            .filter(|(item_id, _)| self.catalog.contains(*item_id))
            .map(|(item_id, record)| {
                let mut candidate =
                    Candidate::new(*item_id, CandidateSource::ClickAffinity, record.count as f32);
                candidate.metadata.click_count = Some(record.count);
                candidate.metadata.last_click_at = Some(record.last_click_at);
                candidate
            })
            .collect();

        debug!("Generated {} click candidates", candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_context::build_user_context;
    use catalog::{Category, Item, ItemId, UserProfile};

    fn create_test_catalog() -> Arc<Catalog> {
        let items = (1..=8)
            .map(|id| Item::new(id, format!("item {id}"), Category::Food, 10.0))
            .collect();
        Arc::new(Catalog::from_items(items))
    }

    fn click(profile: &mut UserProfile, item_id: ItemId, times: u32, last_at: i64) {
        for _ in 0..times {
            profile.record_click(item_id, last_at);
        }
    }

    fn ids(candidates: &[Candidate]) -> Vec<ItemId> {
        candidates.iter().map(|c| c.item_id).collect()
    }

    #[test]
    fn test_threshold_filters_light_clicks() {
        let mut profile = UserProfile::new(1, "u");
        click(&mut profile, 1, 2, 100);
        click(&mut profile, 2, 3, 100);

        let source = ClickAffinitySource::new(create_test_catalog());
        let candidates = source.get_candidates(&build_user_context(&profile));
        assert_eq!(ids(&candidates), vec![2]);
    }

    #[test]
    fn test_orders_by_count_then_recency() {
        let mut profile = UserProfile::new(1, "u");
        click(&mut profile, 1, 3, 100);
        click(&mut profile, 2, 7, 100);
        click(&mut profile, 3, 3, 900);
        click(&mut profile, 4, 5, 100);

        let source = ClickAffinitySource::new(create_test_catalog());
        let candidates = source.get_candidates(&build_user_context(&profile));
        assert_eq!(ids(&candidates), vec![2, 4, 3, 1]);
        assert_eq!(candidates[0].metadata.click_count, Some(7));
    }

    #[test]
    fn test_takes_top_five() {
        let mut profile = UserProfile::new(1, "u");
        for id in 1..=7 {
            click(&mut profile, id, 3 + id, 100);
        }

        let source = ClickAffinitySource::new(create_test_catalog());
        let candidates = source.get_candidates(&build_user_context(&profile));
        assert_eq!(ids(&candidates), vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn test_missing_items_dropped_not_replaced() {
        let mut profile = UserProfile::new(1, "u");
        click(&mut profile, 99, 10, 100); // not in catalog
        for id in 1..=5 {
            click(&mut profile, id, 3, 100);
        }

        let source = ClickAffinitySource::new(create_test_catalog());
        let candidates = source.get_candidates(&build_user_context(&profile));
        // 99 occupied a top-5 slot, so only four remain
        assert_eq!(ids(&candidates), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_no_clicks_gives_empty_list() {
        let source = ClickAffinitySource::new(create_test_catalog());
        let candidates = source.get_candidates(&build_user_context(&UserProfile::new(1, "u")));
        assert!(candidates.is_empty());
    }
}
