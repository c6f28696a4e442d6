//! Helper functions to build UserContext from a stored profile
//!
//! The context is gathered once per request so the sources never go back
//! to the profile store while ranking.

use crate::types::UserContext;
use catalog::UserProfile;

/// Build a UserContext from a user's profile
///
/// Collects:
/// - stated category and tag preferences, plus the price range
/// - the click history as a flat list (one entry per item)
/// - ids of purchased items
pub fn build_user_context(profile: &UserProfile) -> UserContext {
    let mut context = UserContext::new(profile.id);

    context.preferred_categories = profile.preferences.categories.clone();
    context.preferred_tags = profile.preferences.tags.clone();
    context.price_range = profile.preferences.price_range;

    context.clicks = profile
        .click_history
        .iter()
        .map(|(item_id, record)| (*item_id, *record))
        .collect();

    context.purchased_items = profile
        .purchase_history
        .iter()
        .map(|purchase| purchase.item_id)
        .collect();

    context
}
