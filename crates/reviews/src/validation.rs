//! Review submission input and its validation.
//!
//! Validation is local and runs before any store call, so a rejected
//! submission never leaves a trace.

use catalog::{ItemId, NewReview, SubRatingKind, SubRatings, Timestamp, UserId};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{Result, ReviewError};

/// Raw review input as a caller sends it. Every field may be missing or
/// malformed; [`ReviewSubmission::validate`] decides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReviewSubmission {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub sub_ratings: BTreeMap<SubRatingKind, f64>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl ReviewSubmission {
    pub fn new(
        item_id: ItemId,
        user_id: UserId,
        user_name: impl Into<String>,
        rating: f64,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            item_id: Some(item_id),
            user_id: Some(user_id),
            user_name: user_name.into(),
            rating: Some(rating),
            sub_ratings: BTreeMap::new(),
            comment: comment.into(),
            created_at: None,
        }
    }

    pub fn with_sub_rating(mut self, kind: SubRatingKind, value: f64) -> Self {
        self.sub_ratings.insert(kind, value);
        self
    }

    pub fn with_created_at(mut self, at: Timestamp) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Parse a JSON submission. Malformed JSON (a non-numeric rating, an
    /// unknown sub-rating name) is a validation failure.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReviewError::invalid(e.to_string()))
    }

    /// Check every field and produce the review to insert.
    pub fn validate(&self) -> Result<NewReview> {
        let item_id = self
            .item_id
            .ok_or_else(|| ReviewError::invalid("item reference is required"))?;
        let user_id = self
            .user_id
            .ok_or_else(|| ReviewError::invalid("author is required"))?;

        let user_name = self.user_name.trim();
        if user_name.is_empty() {
            return Err(ReviewError::invalid("author name is required"));
        }

        let rating = self
            .rating
            .ok_or_else(|| ReviewError::invalid("rating is required"))?;
        let rating = star_value("rating", rating)?;

        let mut sub_ratings = SubRatings::default();
        for (kind, value) in &self.sub_ratings {
            sub_ratings.set(*kind, Some(star_value(kind.as_str(), *value)?));
        }

        let comment = self.comment.trim();
        if comment.is_empty() {
            return Err(ReviewError::invalid("comment must not be empty"));
        }

        Ok(NewReview {
            item_id,
            user_id,
            user_name: user_name.to_string(),
            rating,
            sub_ratings,
            comment: comment.to_string(),
            created_at: self.created_at,
        })
    }
}

/// An integer rating in 1..=5
fn star_value(field: &str, value: f64) -> Result<u8> {
    if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
        return Err(ReviewError::invalid(format!(
            "{field} must be an integer from 1 to 5, got {value}"
        )));
    }
    Ok(value as u8)
}
