//! Assembly of the personalized recommendation feed.
//!
//! This crate provides:
//! - RecommendationAssembler for blending candidate lists into a feed
//! - resolve_feed for turning the feed into catalog items
//!
//! ## Architecture
//! The feed is built in stages:
//! 1. Sources rank click-affinity and preference candidates
//! 2. The assembler fills click slots, then preference slots
//! 3. Global popularity pads whatever is left
//! 4. Candidates are resolved against the catalog snapshot
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{RecommendationAssembler, resolve_feed};
//!
//! let assembler = RecommendationAssembler::new();
//! let (feed, breakdown) = assembler.assemble(click, preference, &popularity);
//! let recommendations = resolve_feed(&catalog, &feed);
//! ```

pub mod assembler;
pub mod feed;

// Re-export main types
pub use assembler::{
    DEFAULT_CLICK_SLOTS, DEFAULT_FEED_SIZE, RecommendationAssembler, SlotBreakdown,
};
pub use feed::{Recommendation, resolve_feed};
