//! Rating aggregate and recent-review window maintenance.
//!
//! ## Algorithm
//! - Items with running counters: `rating_sum += r`, `rating_count += 1`,
//!   `rating = round2(sum / count)`. O(1).
//! - Items without them (documents from before the counters existed):
//!   `rating` is recomputed as the mean of the embedded window. Once the
//!   window has evicted entries this is only an approximation of the true
//!   mean; [`crate::reconcile`] migrates such items onto counters.
//!
//! Pure mutation helpers. Callers run them under their own transaction.

use catalog::{EmbeddedReviewSummary, Item, Review, round2};

/// Default size of the embedded recent-review window
pub const DEFAULT_MAX_EMBEDDED: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingAggregator {
    max_embedded: usize,
}

impl Default for RatingAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EMBEDDED)
    }
}

impl RatingAggregator {
    pub fn new(max_embedded: usize) -> Self {
        Self { max_embedded }
    }

    pub fn max_embedded(&self) -> usize {
        self.max_embedded
    }

    /// Reflect a freshly inserted review into its item: window first, then
    /// the aggregate.
    pub fn apply(&self, item: &mut Item, review: &Review) {
        self.push_embedded(item, EmbeddedReviewSummary::from(review));
        self.apply_new_review(item, review.rating);
    }

    /// Append to the window, dropping the oldest entries beyond the limit.
    pub fn push_embedded(&self, item: &mut Item, summary: EmbeddedReviewSummary) {
        item.reviews.push(summary);
        if item.reviews.len() > self.max_embedded {
            let overflow = item.reviews.len() - self.max_embedded;
            item.reviews.drain(..overflow);
        }
    }

    pub fn apply_new_review(&self, item: &mut Item, rating: u8) {
        match (item.rating_sum, item.rating_count) {
            (Some(sum), Some(count)) => {
                let sum = sum.saturating_add(rating as u32);
                let count = count.saturating_add(1);
                item.rating_sum = Some(sum);
                item.rating_count = Some(count);
                item.rating = round2(sum as f64 / count as f64);
            }
            _ => item.rating = window_mean(item),
        }
    }
}

/// Mean overall rating of the embedded window, 0 when empty
pub fn window_mean(item: &Item) -> f64 {
    if item.reviews.is_empty() {
        return 0.0;
    }
    let total: u32 = item.reviews.iter().map(|r| r.rating as u32).sum();
    round2(total as f64 / item.reviews.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{Category, NewReview, ReviewId, SubRatings};

    fn review(id: ReviewId, rating: u8) -> Review {
        NewReview {
            item_id: 1,
            user_id: 1,
            user_name: "ana".to_string(),
            rating,
            sub_ratings: SubRatings::default(),
            comment: format!("review {id}"),
            created_at: Some(id as i64),
        }
        .into_review(id)
    }

    fn window_ids(item: &Item) -> Vec<ReviewId> {
        item.reviews.iter().map(|r| r.review_id).collect()
    }

    #[test]
    fn test_running_counters() {
        let aggregator = RatingAggregator::default();
        let mut item = Item::new(1, "X", Category::Food, 10.0);

        aggregator.apply(&mut item, &review(1, 5));
        assert_eq!(item.rating, 5.0);

        aggregator.apply(&mut item, &review(2, 3));
        assert_eq!(item.rating, 4.0);
        assert_eq!(item.rating_sum, Some(8));
        assert_eq!(item.rating_count, Some(2));
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        let aggregator = RatingAggregator::default();
        let mut item = Item::new(1, "X", Category::Food, 10.0);
        for (id, rating) in [(1, 5), (2, 5), (3, 4)] {
            aggregator.apply(&mut item, &review(id, rating));
        }
        assert_eq!(item.rating, 4.67);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let aggregator = RatingAggregator::new(2);
        let mut item = Item::new(1, "X", Category::Food, 10.0);
        for id in 1..=3 {
            aggregator.apply(&mut item, &review(id, 4));
        }
        assert_eq!(window_ids(&item), vec![2, 3]);
        // evicted reviews still count
        assert_eq!(item.rating_count, Some(3));
    }

    #[test]
    fn test_without_counters_uses_window_mean() {
        let aggregator = RatingAggregator::new(2);
        let mut item = Item::new(1, "X", Category::Food, 10.0).without_counters();

        aggregator.apply(&mut item, &review(1, 1));
        aggregator.apply(&mut item, &review(2, 5));
        assert_eq!(item.rating, 3.0);

        // review 1 is evicted and no longer part of the mean
        aggregator.apply(&mut item, &review(3, 5));
        assert_eq!(item.rating, 5.0);
        assert!(!item.has_running_counters());
    }

    #[test]
    fn test_zero_window_keeps_nothing() {
        let aggregator = RatingAggregator::new(0);
        let mut item = Item::new(1, "X", Category::Food, 10.0);
        aggregator.apply(&mut item, &review(1, 4));
        assert!(item.reviews.is_empty());
        assert_eq!(item.rating, 4.0);
    }
}
