//! Diversity injection for the preference pool.
//!
//! The preference source keeps its highest-quality candidates in place and
//! hands the rest of the pool to a [`DiversityStrategy`] for reordering.
//! Production uses [`RandomShuffle`]; tests plug in [`KeepOrder`] to get a
//! deterministic feed.

use rand::seq::SliceRandom;

use crate::types::Candidate;

/// Reorders the non-pinned tail of a candidate pool in place.
pub trait DiversityStrategy: Send + Sync {
    fn diversify(&self, tail: &mut [Candidate]);

    fn name(&self) -> &'static str;
}

/// Uniform Fisher-Yates shuffle, unseeded: every call may differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomShuffle;

impl DiversityStrategy for RandomShuffle {
    fn diversify(&self, tail: &mut [Candidate]) {
        tail.shuffle(&mut rand::rng());
    }

    fn name(&self) -> &'static str {
        "random_shuffle"
    }
}

/// Leaves the ranking untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepOrder;

impl DiversityStrategy for KeepOrder {
    fn diversify(&self, _tail: &mut [Candidate]) {}

    fn name(&self) -> &'static str {
        "keep_order"
    }
}
