//! Recommendation feed assembly.
//!
//! ## Algorithm
//! 1. Slots 1-5: click candidates in order; if fewer than 5, top up from
//!    the preference list (skipping chosen items) in its order
//! 2. Slots 6-10: unused preference candidates in order, up to 5
//! 3. Pad with global popularity (rating desc, review count desc) until the
//!    feed is full or the catalog is exhausted
//!
//! An item id appears at most once in the feed, whichever source offered
//! it first wins.

use catalog::ItemId;
use sources::{Candidate, PopularitySource};
use std::collections::HashSet;
use tracing::debug;

/// Default number of recommendations per feed
pub const DEFAULT_FEED_SIZE: usize = 10;

/// Default number of slots reserved for click affinity
pub const DEFAULT_CLICK_SLOTS: usize = 5;

/// Where each slot of the last assembled feed came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotBreakdown {
    pub click: usize,
    pub preference_top_up: usize,
    pub preference: usize,
    pub popularity: usize,
}

/// Blends ranked candidate lists into a fixed-size feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationAssembler {
    feed_size: usize,
    click_slots: usize,
}

impl Default for RecommendationAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationAssembler {
    pub fn new() -> Self {
        Self {
            feed_size: DEFAULT_FEED_SIZE,
            click_slots: DEFAULT_CLICK_SLOTS,
        }
    }

    /// Configure the feed size (default: 10). Click slots never exceed it.
    pub fn with_feed_size(mut self, feed_size: usize) -> Self {
        self.feed_size = feed_size;
        self.click_slots = DEFAULT_CLICK_SLOTS.min(feed_size);
        self
    }

    pub fn feed_size(&self) -> usize {
        self.feed_size
    }

    /// Build the feed. `popularity` is only consulted when the ranked
    /// lists cannot fill it.
    pub fn assemble(
        &self,
        click: Vec<Candidate>,
        preference: Vec<Candidate>,
        popularity: &PopularitySource,
    ) -> (Vec<Candidate>, SlotBreakdown) {
        let mut feed = Feed::with_capacity(self.feed_size);
        let mut breakdown = SlotBreakdown::default();

        breakdown.click = feed.fill(click, self.click_slots);

        let mut preference = preference.into_iter();
        breakdown.preference_top_up = feed.fill(preference.by_ref(), self.click_slots);
        // the top-up either reached the click slots or drained the list
        breakdown.preference = feed.fill(preference, self.feed_size);

        let missing = self.feed_size - feed.len();
        if missing > 0 {
            let padding = popularity.get_candidates(&feed.seen, missing);
            breakdown.popularity = feed.fill(padding, self.feed_size);
        }

        debug!(
            "Assembled feed: {} click, {} preference top-up, {} preference, {} popular",
            breakdown.click, breakdown.preference_top_up, breakdown.preference, breakdown.popularity
        );
        (feed.chosen, breakdown)
    }
}

/// Feed under construction: chosen candidates plus their ids.
struct Feed {
    chosen: Vec<Candidate>,
    seen: HashSet<ItemId>,
}

impl Feed {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            chosen: Vec::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    fn len(&self) -> usize {
        self.chosen.len()
    }

    /// Take unseen candidates in order until the feed holds `up_to`.
    /// Returns how many were added.
    fn fill<I: IntoIterator<Item = Candidate>>(&mut self, candidates: I, up_to: usize) -> usize {
        let before = self.chosen.len();
        let mut candidates = candidates.into_iter();
        while self.chosen.len() < up_to {
            let Some(candidate) = candidates.next() else {
                break;
            };
            if self.seen.insert(candidate.item_id) {
                self.chosen.push(candidate);
            }
        }
        self.chosen.len() - before
    }
}
