//! Types shared by the candidate sources.

use catalog::{Category, ClickRecord, Item, ItemId, PriceRange, Timestamp, UserId};
use std::collections::{BTreeSet, HashSet};

/// Which source produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// Items the user keeps clicking on
    ClickAffinity,
    /// Items matching the user's stated preferences
    Preference,
    /// Globally well-rated items, used as padding and fallback
    Popularity,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::ClickAffinity => "click",
            CandidateSource::Preference => "preference",
            CandidateSource::Popularity => "popular",
        }
    }
}

/// Extra information about why an item was picked
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateMetadata {
    /// Click count (click affinity)
    pub click_count: Option<u32>,
    pub last_click_at: Option<Timestamp>,
    /// Category was one of the preferred ones (preference)
    pub matched_category: bool,
    /// Preferred tags the item carries (preference)
    pub matched_tags: Vec<String>,
    /// Kept in place by diversity injection (preference)
    pub pinned: bool,
}

/// One ranked item id
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub item_id: ItemId,
    pub source: CandidateSource,
    /// Source-specific score; only comparable within one source
    pub base_score: f32,
    pub metadata: CandidateMetadata,
}

impl Candidate {
    pub fn new(item_id: ItemId, source: CandidateSource, base_score: f32) -> Self {
        Self {
            item_id,
            source,
            base_score,
            metadata: CandidateMetadata::default(),
        }
    }
}

/// What the sources need to know about a user, gathered once per request.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: UserId,
    pub preferred_categories: BTreeSet<Category>,
    pub preferred_tags: BTreeSet<String>,
    pub price_range: Option<PriceRange>,
    /// Click history, one entry per item
    pub clicks: Vec<(ItemId, ClickRecord)>,
    pub purchased_items: HashSet<ItemId>,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn has_preferences(&self) -> bool {
        !self.preferred_categories.is_empty() || !self.preferred_tags.is_empty()
    }

    /// Preference match: category in the preferred set OR a shared tag.
    ///
    /// An empty set does not take part in the match; with both empty every
    /// item matches.
    pub fn matches_preferences(&self, item: &Item) -> bool {
        if !self.has_preferences() {
            return true;
        }
        self.preferred_categories.contains(&item.category)
            || !self.preferred_tags.is_disjoint(&item.tags)
    }
}
