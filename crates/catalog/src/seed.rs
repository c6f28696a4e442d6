//! Seed data loading.
//!
//! A seed file is a single JSON document:
//!
//! ```json
//! { "items": [...], "users": [...], "reviews": [...] }
//! ```
//!
//! Every section is optional. Records use the same field names as the
//! stored documents.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use crate::error::SeedError;
use crate::memory::MemoryStore;
use crate::types::{Item, ItemId, Review, UserProfile};

/// Parsed contents of a seed file
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// Parse seed JSON text. `file` is only used for error messages.
pub fn parse_seed(json: &str, file: &str) -> Result<Seed, SeedError> {
    serde_json::from_str(json).map_err(|e| SeedError::ParseError {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

/// Read, parse and validate a seed file.
pub fn load_seed(path: &Path) -> Result<Seed, SeedError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SeedError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => SeedError::IoError(e),
    })?;
    let seed = parse_seed(&text, &path.display().to_string())?;
    seed.validate()?;

    info!(
        "Loaded seed with {} items, {} users, {} reviews",
        seed.items.len(),
        seed.users.len(),
        seed.reviews.len()
    );
    Ok(seed)
}

impl Seed {
    /// Check that:
    /// - ids are unique per collection
    /// - prices are non-negative and ratings lie in their ranges
    /// - every review references a seeded item
    pub fn validate(&self) -> Result<(), SeedError> {
        let mut item_ids: HashSet<ItemId> = HashSet::new();
        for item in &self.items {
            if !item_ids.insert(item.id) {
                return Err(SeedError::duplicate("Item", item.id as u64));
            }
            if !(item.price >= 0.0) {
                return Err(invalid("price", item.price));
            }
            if !(0.0..=5.0).contains(&item.rating) {
                return Err(invalid("rating", item.rating));
            }
        }

        let mut user_ids = HashSet::new();
        for user in &self.users {
            if !user_ids.insert(user.id) {
                return Err(SeedError::duplicate_user(user.id));
            }
        }

        let mut review_ids = HashSet::new();
        for review in &self.reviews {
            if !review_ids.insert(review.id) {
                return Err(SeedError::duplicate_review(review.id));
            }
            if !item_ids.contains(&review.item_id) {
                return Err(SeedError::missing_item(review.item_id));
            }
            if !(1..=5).contains(&review.rating) {
                return Err(invalid("review.rating", review.rating));
            }
            for (kind, value) in review.sub_ratings.iter() {
                if !(1..=5).contains(&value) {
                    return Err(invalid(&format!("review.{kind}"), value));
                }
            }
        }
        Ok(())
    }

    /// Ids of items that seeded reviews point at
    pub fn reviewed_item_ids(&self) -> BTreeSet<ItemId> {
        self.reviews.iter().map(|r| r.item_id).collect()
    }

    /// Load every seeded document into a fresh store.
    pub async fn into_store(self, store: &MemoryStore) {
        for item in self.items {
            store.insert_item(item).await;
        }
        for user in self.users {
            store.insert_profile(user).await;
        }
        for review in self.reviews {
            store.insert_existing_review(review).await;
        }
    }
}

fn invalid(field: &str, value: impl ToString) -> SeedError {
    SeedError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ItemStore, ReviewFilter, ReviewStore, UserProfileStore};
    use crate::types::Category;

    const SEED: &str = r#"{
        "items": [
            {"id": 1, "name": "Hot Pot", "category": "food", "price": 80, "tags": ["spicy"],
             "location": {"city": "Chengdu"}},
            {"id": 2, "name": "Panda Base", "category": "attraction", "price": 55, "rating": 4.9}
        ],
        "users": [
            {"id": 7, "name": "lin",
             "preferences": {"categories": ["food"], "tags": []},
             "click_history": {"1": {"count": 4, "last_click_at": 100}}}
        ],
        "reviews": [
            {"id": 10, "item_id": 1, "user_id": 7, "user_name": "lin", "rating": 5,
             "taste": 5, "comment": "numbing!", "created_at": 50}
        ]
    }"#;

    #[test]
    fn test_parse_seed() {
        let seed = parse_seed(SEED, "inline").unwrap();
        assert_eq!(seed.items.len(), 2);
        assert_eq!(seed.items[0].category, Category::Food);
        // absent counters are read as pre-counter documents
        assert!(!seed.items[1].has_running_counters());
        assert_eq!(seed.users[0].click_history[&1].count, 4);
        assert_eq!(seed.reviews[0].sub_ratings.taste, Some(5));
        assert!(seed.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let seed = parse_seed("{}", "inline").unwrap();
        assert!(seed.items.is_empty() && seed.users.is_empty() && seed.reviews.is_empty());
    }

    #[test]
    fn test_review_for_unknown_item_rejected() {
        let mut seed = parse_seed(SEED, "inline").unwrap();
        seed.reviews[0].item_id = 99;
        assert!(matches!(
            seed.validate(),
            Err(SeedError::MissingReference { id: 99, .. })
        ));
    }

    #[test]
    fn test_out_of_range_rating_rejected() {
        let mut seed = parse_seed(SEED, "inline").unwrap();
        seed.reviews[0].rating = 6;
        assert!(matches!(seed.validate(), Err(SeedError::InvalidValue { .. })));
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            parse_seed("{\"items\": 3}", "broken.json"),
            Err(SeedError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_seed(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(SeedError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn test_into_store_keeps_review_ids() {
        let seed = parse_seed(SEED, "inline").unwrap();
        let store = MemoryStore::new();
        seed.into_store(&store).await;

        assert!(store.find_item(2).await.unwrap().is_some());
        assert!(store.find_profile(7).await.unwrap().is_some());
        assert_eq!(store.count_reviews(&ReviewFilter::for_item(1)).await.unwrap(), 1);

        // new reviews continue after the seeded ids
        let next = store
            .insert_review(crate::types::NewReview {
                item_id: 1,
                user_id: 7,
                user_name: "lin".to_string(),
                rating: 4,
                sub_ratings: Default::default(),
                comment: "again".to_string(),
                created_at: None,
            })
            .await
            .unwrap();
        assert_eq!(next.id, 11);
    }
}
