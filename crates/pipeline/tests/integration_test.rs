//! Integration tests for the feed pipeline.
//!
//! These tests run the sources and the assembler together over a small
//! catalog, the way the service does per request.

use catalog::{Catalog, Category, Item, ItemId, UserProfile};
use pipeline::{RecommendationAssembler, resolve_feed};
use sources::{
    Candidate, ClickAffinitySource, KeepOrder, PopularitySource, PreferenceSource,
    user_context::build_user_context,
};
use std::collections::HashSet;
use std::sync::Arc;

fn create_test_catalog() -> Arc<Catalog> {
    let mut items = Vec::new();
    for id in 1..=12 {
        items.push(
            Item::new(id, format!("restaurant {id}"), Category::Food, 40.0)
                .with_rating(3.0 + (id % 5) as f64 * 0.4)
                .with_tags(["local"]),
        );
    }
    for id in 13..=20 {
        items.push(
            Item::new(id, format!("sight {id}"), Category::Attraction, 0.0)
                .with_rating(2.5 + (id % 4) as f64 * 0.5),
        );
    }
    for id in 21..=25 {
        items.push(Item::new(id, format!("hotel {id}"), Category::Hotel, 300.0).with_rating(4.9));
    }
    Arc::new(Catalog::from_items(items))
}

fn run_feed(catalog: &Arc<Catalog>, profile: &UserProfile) -> Vec<Candidate> {
    let context = build_user_context(profile);
    let click = ClickAffinitySource::new(catalog.clone()).get_candidates(&context);
    let preference = PreferenceSource::new(catalog.clone()).get_candidates(&context);
    let popularity = PopularitySource::new(catalog.clone());
    RecommendationAssembler::new()
        .assemble(click, preference, &popularity)
        .0
}

fn ids(feed: &[Candidate]) -> Vec<ItemId> {
    feed.iter().map(|c| c.item_id).collect()
}

#[test]
fn test_feed_is_bounded_and_unique() {
    let catalog = create_test_catalog();

    let mut profiles = vec![UserProfile::new(1, "blank")];
    let mut clicker = UserProfile::new(2, "clicker");
    for id in [3, 3, 3, 21, 21, 21, 21, 14, 14, 14] {
        clicker.record_click(id, 10);
    }
    clicker.preferences.categories.insert(Category::Hotel);
    clicker.preferences.tags.insert("local".to_string());
    profiles.push(clicker);

    for profile in &profiles {
        for _ in 0..10 {
            let feed = run_feed(&catalog, profile);
            assert!(feed.len() <= 10);
            let unique: HashSet<ItemId> = ids(&feed).into_iter().collect();
            assert_eq!(unique.len(), feed.len());
        }
    }
}

#[test]
fn test_click_slots_follow_click_counts() {
    let catalog = create_test_catalog();
    let mut profile = UserProfile::new(1, "regular");
    // item 16 clicked 9 times, 2 -> 8, 22 -> 7, 7 -> 5, 18 -> 3, 5 -> 3 (older)
    for (id, times, at) in [(16, 9, 50), (2, 8, 50), (22, 7, 50), (7, 5, 50), (18, 3, 90), (5, 3, 10)] {
        for _ in 0..times {
            profile.record_click(id, at);
        }
    }
    profile.preferences.categories.insert(Category::Food);

    let feed = run_feed(&catalog, &profile);
    assert_eq!(feed.len(), 10);
    assert_eq!(ids(&feed[..5]), vec![16, 2, 22, 7, 18]);
}

#[test]
fn test_food_preference_without_clicks() {
    let catalog = Arc::new(Catalog::from_items(vec![
        Item::new(1, "Noodles", Category::Food, 10.0).with_rating(4.0),
        Item::new(2, "Dumplings", Category::Food, 10.0).with_rating(4.5),
        Item::new(3, "Tea House", Category::Food, 10.0).with_rating(3.0),
        Item::new(4, "Museum", Category::Attraction, 0.0).with_rating(4.8),
        Item::new(5, "Hostel", Category::Hotel, 50.0).with_rating(3.9),
    ]));
    let mut profile = UserProfile::new(1, "foodie");
    profile.preferences.categories.insert(Category::Food);

    let context = build_user_context(&profile);
    let click = ClickAffinitySource::new(catalog.clone()).get_candidates(&context);
    let preference = PreferenceSource::new(catalog.clone())
        .with_diversity(Arc::new(KeepOrder))
        .get_candidates(&context);
    let (feed, breakdown) = RecommendationAssembler::new().assemble(
        click,
        preference,
        &PopularitySource::new(catalog.clone()),
    );

    // the three food items lead, the others only appear as padding
    assert_eq!(ids(&feed), vec![2, 1, 3, 4, 5]);
    assert_eq!(breakdown.click, 0);
    assert_eq!(breakdown.popularity, 2);

    let recommendations = resolve_feed(&catalog, &feed);
    assert_eq!(recommendations[0].item.name, "Dumplings");
    assert_eq!(recommendations[3].source, "popular");
}
