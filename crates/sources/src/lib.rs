//! # Sources Crate
//!
//! Candidate generation for the travel recommendation feed.
//!
//! ## Components
//!
//! ### Click Affinity Source
//! Items the user clicked at least 3 times, most clicked first (top 5).
//!
//! ### Preference Source
//! Items in a preferred category or carrying a preferred tag, ranked by
//! quality. The top 6 of a 15-item pool stay in place and the rest goes
//! through a swappable diversity strategy (random shuffle by default).
//!
//! ### Popularity Source
//! The whole catalog by rating, then review count. Pads short feeds.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{ClickAffinitySource, PreferenceSource, user_context::build_user_context};
//! use catalog::Catalog;
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(Catalog::from_items(items));
//! let context = build_user_context(&profile);
//!
//! let clicks = ClickAffinitySource::new(catalog.clone()).get_candidates(&context);
//! let preferred = PreferenceSource::new(catalog.clone()).get_candidates(&context);
//! ```
//!
//! All sources are pure functions of the context and the catalog snapshot,
//! so they can run in parallel.

pub mod click_affinity;
pub mod diversity;
pub mod popularity;
pub mod preference;
pub mod types;
pub mod user_context;

// Re-export commonly used types
pub use click_affinity::ClickAffinitySource;
pub use diversity::{DiversityStrategy, KeepOrder, RandomShuffle};
pub use popularity::PopularitySource;
pub use preference::PreferenceSource;
pub use types::{Candidate, CandidateMetadata, CandidateSource, UserContext};
