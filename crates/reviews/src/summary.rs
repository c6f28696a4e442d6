//! Review listing and per-item review statistics.

use catalog::{
    ItemId, Page, PageRequest, Review, ReviewFilter, ReviewSort, ReviewStore, StoreResult,
    SubRatingKind, round2,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Default page size for review listings
pub const DEFAULT_REVIEW_PAGE_SIZE: usize = 10;

pub type ReviewPage = Page<Review>;

/// One page of an item's reviews, newest first.
pub async fn list_reviews<S: ReviewStore + ?Sized>(
    store: &S,
    item_id: ItemId,
    request: PageRequest,
) -> StoreResult<ReviewPage> {
    let filter = ReviewFilter::for_item(item_id);
    let total = store.count_reviews(&filter).await?;
    let rows = store
        .find_reviews(
            &filter,
            ReviewSort::NewestFirst,
            request.skip(),
            Some(request.page_size),
        )
        .await?;
    Ok(Page::new(request, total, rows))
}

/// Statistics over every stored review of an item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub item_id: ItemId,
    pub total_reviews: usize,
    /// Mean overall rating, 0 without reviews
    pub average_rating: f64,
    /// Mean per sub-rating over the reviews that carry it
    pub sub_rating_averages: BTreeMap<SubRatingKind, f64>,
}

impl ReviewSummary {
    pub fn from_reviews(item_id: ItemId, reviews: &[Review]) -> Self {
        let total_reviews = reviews.len();
        let average_rating = if total_reviews == 0 {
            0.0
        } else {
            let sum: u32 = reviews.iter().map(|r| r.rating as u32).sum();
            round2(sum as f64 / total_reviews as f64)
        };

        let mut sub_totals: BTreeMap<SubRatingKind, (u32, u32)> = BTreeMap::new();
        for review in reviews {
            for (kind, value) in review.sub_ratings.iter() {
                let entry = sub_totals.entry(kind).or_insert((0, 0));
                entry.0 += value as u32;
                entry.1 += 1;
            }
        }
        let sub_rating_averages = sub_totals
            .into_iter()
            .map(|(kind, (sum, count))| (kind, round2(sum as f64 / count as f64)))
            .collect();

        Self {
            item_id,
            total_reviews,
            average_rating,
            sub_rating_averages,
        }
    }
}

pub async fn review_summary<S: ReviewStore + ?Sized>(
    store: &S,
    item_id: ItemId,
) -> StoreResult<ReviewSummary> {
    let reviews = store
        .find_reviews(
            &ReviewFilter::for_item(item_id),
            ReviewSort::OldestFirst,
            0,
            None,
        )
        .await?;
    Ok(ReviewSummary::from_reviews(item_id, &reviews))
}
