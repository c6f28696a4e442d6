//! Popularity Source - globally well-rated items
//!
//! Ranks the whole catalog by rating desc, then review count desc. Used to
//! pad short feeds and as the feed for users without a profile.

use catalog::{Catalog, Item, ItemId, ItemSort};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::types::{Candidate, CandidateSource};

pub struct PopularitySource {
    catalog: Arc<Catalog>,
}

impl PopularitySource {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Up to `limit` most popular items not in `exclude`
    pub fn get_candidates(&self, exclude: &HashSet<ItemId>, limit: usize) -> Vec<Candidate> {
        let mut items: Vec<&Item> = self
            .catalog
            .items()
            .filter(|item| !exclude.contains(&item.id))
            .collect();
        items.sort_by(|a, b| ItemSort::RatingThenReviews.compare(a, b));

        let candidates: Vec<Candidate> = items
            .into_iter()
            .take(limit)
            .map(|item| Candidate::new(item.id, CandidateSource::Popularity, item.rating as f32))
            .collect();

        debug!("Generated {} popularity candidates", candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Category;

    fn create_test_catalog() -> Arc<Catalog> {
        let mut busy = Item::new(2, "busy", Category::Food, 1.0).with_rating(4.0);
        busy.rating_count = Some(40);
        let mut quiet = Item::new(3, "quiet", Category::Food, 1.0).with_rating(4.0);
        quiet.rating_count = Some(2);

        Arc::new(Catalog::from_items(vec![
            Item::new(1, "best", Category::Hotel, 1.0).with_rating(4.9),
            quiet,
            busy,
            Item::new(4, "meh", Category::Attraction, 1.0).with_rating(2.0),
        ]))
    }

    #[test]
    fn test_rating_then_review_count() {
        let source = PopularitySource::new(create_test_catalog());
        let ids: Vec<ItemId> = source
            .get_candidates(&HashSet::new(), 10)
            .iter()
            .map(|c| c.item_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_exclusions_and_limit() {
        let source = PopularitySource::new(create_test_catalog());
        let exclude: HashSet<ItemId> = [1].into_iter().collect();
        let candidates = source.get_candidates(&exclude, 2);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].item_id, 2);
        assert!(candidates.iter().all(|c| c.source == CandidateSource::Popularity));
    }
}
