//! Core domain types for the marketplace.
//!
//! These are the documents the stores hold: catalog items with their
//! denormalized rating aggregate and recent-review window, the normalized
//! review records, and per-user activity profiles.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::UnknownCategory;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a catalog item
pub type ItemId = u32;

/// Unique identifier for a user profile
pub type UserId = u32;

/// Identifier assigned by the review store on insert
pub type ReviewId = u64;

/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Current wall-clock time as a [`Timestamp`].
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_default()
}

/// Round to two decimal places, the precision ratings are stored with.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Item-related Types
// =============================================================================

/// The fixed set of catalog categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Attraction,
    Food,
    Hotel,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Attraction, Category::Food, Category::Hotel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Attraction => "attraction",
            Category::Food => "food",
            Category::Hotel => "hotel",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attraction" => Ok(Category::Attraction),
            "food" => Ok(Category::Food),
            "hotel" => Ok(Category::Hotel),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Where an item is. Only the city takes part in filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address: String,
}

/// A catalog item (attraction, restaurant or hotel).
///
/// `rating` is the mean of every review ever recorded for the item, rounded
/// to two decimals. `reviews` only holds the most recent window of them.
/// Documents that omit the counters start them at zero. Items written
/// before the counters existed carry an explicit `null`, read as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub price: f64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default = "zero_counter")]
    pub rating_sum: Option<u32>,
    #[serde(default = "zero_counter")]
    pub rating_count: Option<u32>,
    /// Popularity counter, bumped on every recorded purchase
    #[serde(default)]
    pub purchase_count: u32,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub location: Location,
    /// Recent reviews, oldest first
    #[serde(default)]
    pub reviews: Vec<EmbeddedReviewSummary>,
    #[serde(default)]
    pub created_at: Timestamp,
}

fn zero_counter() -> Option<u32> {
    Some(0)
}

impl Item {
    /// A fresh item with zeroed running counters.
    pub fn new(id: ItemId, name: impl Into<String>, category: Category, price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            category,
            price,
            rating: 0.0,
            rating_sum: Some(0),
            rating_count: Some(0),
            purchase_count: 0,
            tags: BTreeSet::new(),
            location: Location::default(),
            reviews: Vec::new(),
            created_at: 0,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_purchase_count(mut self, count: u32) -> Self {
        self.purchase_count = count;
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.location.city = city.into();
        self
    }

    pub fn with_created_at(mut self, at: Timestamp) -> Self {
        self.created_at = at;
        self
    }

    /// Drop the running counters, as found on documents written before they existed.
    pub fn without_counters(mut self) -> Self {
        self.rating_sum = None;
        self.rating_count = None;
        self
    }

    /// Whether the O(1) aggregate counters are present.
    pub fn has_running_counters(&self) -> bool {
        self.rating_sum.is_some() && self.rating_count.is_some()
    }

    /// Number of reviews behind `rating`, as far as the document knows.
    pub fn review_count(&self) -> u32 {
        self.rating_count.unwrap_or(self.reviews.len() as u32)
    }
}

// =============================================================================
// Review-related Types
// =============================================================================

/// The optional named sub-ratings a review may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubRatingKind {
    Taste,
    Service,
    Environment,
    Comfort,
    Location,
    Scenery,
    Transportation,
}

impl SubRatingKind {
    pub const ALL: [SubRatingKind; 7] = [
        SubRatingKind::Taste,
        SubRatingKind::Service,
        SubRatingKind::Environment,
        SubRatingKind::Comfort,
        SubRatingKind::Location,
        SubRatingKind::Scenery,
        SubRatingKind::Transportation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubRatingKind::Taste => "taste",
            SubRatingKind::Service => "service",
            SubRatingKind::Environment => "environment",
            SubRatingKind::Comfort => "comfort",
            SubRatingKind::Location => "location",
            SubRatingKind::Scenery => "scenery",
            SubRatingKind::Transportation => "transportation",
        }
    }
}

impl fmt::Display for SubRatingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sparse record of sub-ratings, each 1-5 when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRatings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taste: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comfort: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenery: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transportation: Option<u8>,
}

impl SubRatings {
    pub fn get(&self, kind: SubRatingKind) -> Option<u8> {
        match kind {
            SubRatingKind::Taste => self.taste,
            SubRatingKind::Service => self.service,
            SubRatingKind::Environment => self.environment,
            SubRatingKind::Comfort => self.comfort,
            SubRatingKind::Location => self.location,
            SubRatingKind::Scenery => self.scenery,
            SubRatingKind::Transportation => self.transportation,
        }
    }

    pub fn set(&mut self, kind: SubRatingKind, value: Option<u8>) {
        let slot = match kind {
            SubRatingKind::Taste => &mut self.taste,
            SubRatingKind::Service => &mut self.service,
            SubRatingKind::Environment => &mut self.environment,
            SubRatingKind::Comfort => &mut self.comfort,
            SubRatingKind::Location => &mut self.location,
            SubRatingKind::Scenery => &mut self.scenery,
            SubRatingKind::Transportation => &mut self.transportation,
        };
        *slot = value;
    }

    /// Present sub-ratings in the fixed kind order.
    pub fn iter(&self) -> impl Iterator<Item = (SubRatingKind, u8)> + '_ {
        SubRatingKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|value| (kind, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// A review as held by the review store. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub item_id: ItemId,
    pub user_id: UserId,
    pub user_name: String,
    pub rating: u8,
    #[serde(flatten)]
    pub sub_ratings: SubRatings,
    pub comment: String,
    pub created_at: Timestamp,
}

/// A review not yet inserted; the store assigns the id and, when
/// `created_at` is absent, the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub item_id: ItemId,
    pub user_id: UserId,
    pub user_name: String,
    pub rating: u8,
    pub sub_ratings: SubRatings,
    pub comment: String,
    pub created_at: Option<Timestamp>,
}

impl NewReview {
    /// Resolve into a stored review with the given identity.
    pub fn into_review(self, id: ReviewId) -> Review {
        Review {
            id,
            item_id: self.item_id,
            user_id: self.user_id,
            user_name: self.user_name,
            rating: self.rating,
            sub_ratings: self.sub_ratings,
            comment: self.comment,
            created_at: self.created_at.unwrap_or_else(now_millis),
        }
    }
}

/// Denormalized copy of a review kept on its item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedReviewSummary {
    pub review_id: ReviewId,
    pub user_id: UserId,
    pub user_name: String,
    pub rating: u8,
    #[serde(flatten)]
    pub sub_ratings: SubRatings,
    pub comment: String,
    pub created_at: Timestamp,
}

impl From<&Review> for EmbeddedReviewSummary {
    fn from(review: &Review) -> Self {
        Self {
            review_id: review.id,
            user_id: review.user_id,
            user_name: review.user_name.clone(),
            rating: review.rating,
            sub_ratings: review.sub_ratings,
            comment: review.comment.clone(),
            created_at: review.created_at,
        }
    }
}

// =============================================================================
// User-related Types
// =============================================================================

/// Inclusive price bounds a user is interested in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Stated preferences. Empty sets mean "no preference" on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub categories: BTreeSet<Category>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
}

/// Click statistics for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickRecord {
    pub count: u32,
    pub last_click_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub item_id: ItemId,
    pub item_name: String,
    pub category: Category,
    pub price: f64,
    pub purchased_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub item_id: ItemId,
    pub viewed_at: Timestamp,
    pub duration_secs: u32,
}

/// Everything the recommender knows about a user.
///
/// The click history is keyed by item, so it can never hold two entries
/// for the same item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub click_history: BTreeMap<ItemId, ClickRecord>,
    #[serde(default)]
    pub purchase_history: Vec<PurchaseRecord>,
    #[serde(default)]
    pub view_history: Vec<ViewRecord>,
}

impl UserProfile {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Count one click on `item_id` and return the item's new click count.
    pub fn record_click(&mut self, item_id: ItemId, at: Timestamp) -> u32 {
        let record = self.click_history.entry(item_id).or_insert(ClickRecord {
            count: 0,
            last_click_at: at,
        });
        record.count = record.count.saturating_add(1);
        record.last_click_at = record.last_click_at.max(at);
        record.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!("Food".parse::<Category>().unwrap(), Category::Food);
        assert_eq!(" hotel ".parse::<Category>().unwrap(), Category::Hotel);
        assert!("museum".parse::<Category>().is_err());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(4.0), 4.0);
        assert_eq!(round2(11.0 / 3.0), 3.67);
        assert_eq!(round2(10.0 / 3.0), 3.33);
    }

    #[test]
    fn test_sub_ratings_iter_follows_kind_order() {
        let mut subs = SubRatings::default();
        assert!(subs.is_empty());

        subs.set(SubRatingKind::Scenery, Some(4));
        subs.set(SubRatingKind::Taste, Some(5));

        let present: Vec<_> = subs.iter().collect();
        assert_eq!(
            present,
            vec![(SubRatingKind::Taste, 5), (SubRatingKind::Scenery, 4)]
        );
    }

    #[test]
    fn test_review_serializes_sub_ratings_flat() {
        let review = NewReview {
            item_id: 7,
            user_id: 1,
            user_name: "ana".to_string(),
            rating: 4,
            sub_ratings: SubRatings {
                taste: Some(5),
                ..Default::default()
            },
            comment: "great noodles".to_string(),
            created_at: Some(1_000),
        }
        .into_review(3);

        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["taste"], 5);
        assert!(json.get("service").is_none());

        let back: Review = serde_json::from_value(json).unwrap();
        assert_eq!(back, review);
    }

    #[test]
    fn test_new_review_defaults_timestamp() {
        let before = now_millis();
        let review = NewReview {
            item_id: 1,
            user_id: 1,
            user_name: "x".to_string(),
            rating: 3,
            sub_ratings: SubRatings::default(),
            comment: "ok".to_string(),
            created_at: None,
        }
        .into_review(1);
        assert!(review.created_at >= before);
    }

    #[test]
    fn test_record_click_keeps_one_entry_per_item() {
        let mut profile = UserProfile::new(1, "ana");

        assert_eq!(profile.record_click(10, 100), 1);
        assert_eq!(profile.record_click(10, 200), 2);
        assert_eq!(profile.record_click(11, 150), 1);

        assert_eq!(profile.click_history.len(), 2);
        assert_eq!(profile.click_history[&10].last_click_at, 200);
    }

    #[test]
    fn test_record_click_never_moves_time_backwards() {
        let mut profile = UserProfile::new(1, "ana");
        profile.record_click(10, 500);
        profile.record_click(10, 100);
        assert_eq!(profile.click_history[&10].count, 2);
        assert_eq!(profile.click_history[&10].last_click_at, 500);
    }

    #[test]
    fn test_item_review_count_falls_back_to_window() {
        let item = Item::new(1, "Old Town", Category::Attraction, 0.0).without_counters();
        assert!(!item.has_running_counters());
        assert_eq!(item.review_count(), 0);
    }

    #[test]
    fn test_missing_counters_start_at_zero() {
        let fresh: Item = serde_json::from_str(
            r#"{"id": 1, "name": "Tea Garden", "category": "food", "price": 20.0, "rating": 4.2}"#,
        )
        .unwrap();
        assert_eq!(fresh.rating_sum, Some(0));
        assert_eq!(fresh.rating_count, Some(0));

        let legacy: Item = serde_json::from_str(
            r#"{"id": 2, "name": "Old Gate", "category": "attraction", "price": 0.0,
                "rating_sum": null, "rating_count": null}"#,
        )
        .unwrap();
        assert!(!legacy.has_running_counters());

        let round_trip: Item =
            serde_json::from_str(&serde_json::to_string(&legacy).unwrap()).unwrap();
        assert!(!round_trip.has_running_counters());
    }
}
