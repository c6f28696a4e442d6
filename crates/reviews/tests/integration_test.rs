//! Integration tests for the review write path
//!
//! Exercises the coordinator against the in-memory store in both
//! replicated (transactional) and single-node (degraded) mode.

use catalog::{
    Category, Item, ItemStore, MemoryStore, NewReview, PageRequest, ReviewFilter, ReviewStore,
    SubRatings,
};
use reviews::{
    RatingAggregator, Reconciler, ReviewError, ReviewSubmission, ReviewWriteCoordinator,
    list_reviews,
};
use std::sync::Arc;

const ITEM: u32 = 1;

async fn create_test_store(store: MemoryStore) -> Arc<MemoryStore> {
    store
        .insert_item(Item::new(ITEM, "Lakeside Inn", Category::Hotel, 320.0))
        .await;
    Arc::new(store)
}

fn submission(rating: f64, comment: &str) -> ReviewSubmission {
    ReviewSubmission::new(ITEM, 7, "lin", rating, comment)
}

#[tokio::test]
async fn test_aggregate_matches_mean_of_all_submissions() {
    let store = create_test_store(MemoryStore::new()).await;
    let coordinator =
        ReviewWriteCoordinator::new(store.clone()).with_aggregator(RatingAggregator::new(3));

    let ratings = [5, 4, 4, 1, 3, 5, 2, 4];
    for (i, rating) in ratings.iter().enumerate() {
        coordinator
            .submit(&submission(*rating as f64, &format!("stay {i}")))
            .await
            .unwrap();
    }

    let expected = ratings.iter().sum::<i32>() as f64 / ratings.len() as f64;
    let item = store.find_item(ITEM).await.unwrap().unwrap();
    assert_eq!(item.rating, (expected * 100.0).round() / 100.0);
    assert_eq!(item.rating_count, Some(ratings.len() as u32));
}

#[tokio::test]
async fn test_embedded_window_holds_most_recent_in_order() {
    let store = create_test_store(MemoryStore::new()).await;
    let max_embedded = 4;
    let coordinator = ReviewWriteCoordinator::new(store.clone())
        .with_aggregator(RatingAggregator::new(max_embedded));

    let mut ids = Vec::new();
    for i in 0..10 {
        let review = coordinator
            .submit(&submission(4.0, &format!("visit {i}")))
            .await
            .unwrap();
        ids.push(review.id);
    }

    let item = store.find_item(ITEM).await.unwrap().unwrap();
    let window: Vec<u64> = item.reviews.iter().map(|r| r.review_id).collect();
    assert_eq!(window, ids[ids.len() - max_embedded..].to_vec());
}

#[tokio::test]
async fn test_invalid_submissions_change_nothing() {
    let store = create_test_store(MemoryStore::new()).await;
    let coordinator = ReviewWriteCoordinator::new(store.clone());
    coordinator.submit(&submission(5.0, "first")).await.unwrap();
    let before = serde_json::to_string(&store.snapshot().await).unwrap();

    let mut missing_author = submission(4.0, "who?");
    missing_author.user_id = None;

    let invalid = [
        submission(0.0, "too low"),
        submission(6.0, "too high"),
        submission(4.0, "   "),
        missing_author,
    ];
    for bad in &invalid {
        let err = coordinator.submit(bad).await.unwrap_err();
        assert!(matches!(err, ReviewError::ValidationFailed(_)));
    }

    let after = serde_json::to_string(&store.snapshot().await).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_running_counter_example() {
    let store = create_test_store(MemoryStore::new()).await;
    let coordinator = ReviewWriteCoordinator::new(store.clone());

    coordinator.submit(&submission(5.0, "superb")).await.unwrap();
    assert_eq!(store.find_item(ITEM).await.unwrap().unwrap().rating, 5.0);

    coordinator.submit(&submission(3.0, "fine")).await.unwrap();
    let item = store.find_item(ITEM).await.unwrap().unwrap();
    assert_eq!(item.rating, 4.0);
    assert_eq!(item.rating_sum, Some(8));
    assert_eq!(item.rating_count, Some(2));
}

#[tokio::test]
async fn test_evicted_review_still_stored_and_counted() {
    let store = create_test_store(MemoryStore::new()).await;
    let coordinator =
        ReviewWriteCoordinator::new(store.clone()).with_aggregator(RatingAggregator::new(2));

    let r1 = coordinator.submit(&submission(1.0, "r1")).await.unwrap();
    let r2 = coordinator.submit(&submission(5.0, "r2")).await.unwrap();
    let r3 = coordinator.submit(&submission(5.0, "r3")).await.unwrap();

    let item = store.find_item(ITEM).await.unwrap().unwrap();
    let window: Vec<u64> = item.reviews.iter().map(|r| r.review_id).collect();
    assert_eq!(window, vec![r2.id, r3.id]);
    assert_eq!(item.rating, 3.67);

    let all = list_reviews(store.as_ref(), ITEM, PageRequest::new(1, 10))
        .await
        .unwrap();
    assert!(all.rows.iter().any(|r| r.id == r1.id));
}

#[tokio::test]
async fn test_out_of_range_rating_keeps_listing_unchanged() {
    let store = create_test_store(MemoryStore::new()).await;
    let coordinator = ReviewWriteCoordinator::new(store.clone());

    let before = list_reviews(store.as_ref(), ITEM, PageRequest::new(1, 10))
        .await
        .unwrap()
        .total;
    let err = coordinator.submit(&submission(6.0, "off the scale")).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_FAILED");

    let after = list_reviews(store.as_ref(), ITEM, PageRequest::new(1, 10))
        .await
        .unwrap()
        .total;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_transactional_missing_item_leaves_no_orphan() {
    let store = create_test_store(MemoryStore::new()).await;
    let coordinator = ReviewWriteCoordinator::new(store.clone());

    let mut orphan = submission(4.0, "nowhere");
    orphan.item_id = Some(404);
    let err = coordinator.submit(&orphan).await.unwrap_err();

    assert_eq!(err, ReviewError::ItemNotFound(404));
    assert_eq!(store.count_reviews(&ReviewFilter::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_transactional_submissions_lose_nothing() {
    let store = create_test_store(MemoryStore::new()).await;
    let coordinator = Arc::new(ReviewWriteCoordinator::new(store.clone()));

    let mut handles = Vec::new();
    for i in 0..32 {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            let rating = (i % 5 + 1) as f64;
            coordinator
                .submit(&submission(rating, &format!("guest {i}")))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let item = store.find_item(ITEM).await.unwrap().unwrap();
    assert_eq!(item.rating_count, Some(32));
    // ratings cycle 1..=5: six full cycles (90) plus 1 + 2
    assert_eq!(item.rating_sum, Some(93));
    assert_eq!(store.count_reviews(&ReviewFilter::for_item(ITEM)).await.unwrap(), 32);
}

#[tokio::test]
async fn test_degraded_path_full_success() {
    let store = create_test_store(MemoryStore::single_node()).await;
    let coordinator = ReviewWriteCoordinator::new(store.clone());

    coordinator.submit(&submission(2.0, "noisy")).await.unwrap();
    coordinator.submit(&submission(4.0, "better")).await.unwrap();

    let item = store.find_item(ITEM).await.unwrap().unwrap();
    assert_eq!(item.rating, 3.0);
    assert_eq!(item.reviews.len(), 2);
}

#[tokio::test]
async fn test_reconcile_repairs_lost_degraded_update() {
    let store = create_test_store(MemoryStore::single_node()).await;
    let coordinator = ReviewWriteCoordinator::new(store.clone());
    coordinator.submit(&submission(5.0, "great")).await.unwrap();

    // a review that reached the store without its item update
    store
        .insert_review(NewReview {
            item_id: ITEM,
            user_id: 8,
            user_name: "bo".to_string(),
            rating: 1,
            sub_ratings: SubRatings::default(),
            comment: "cold room".to_string(),
            created_at: None,
        })
        .await
        .unwrap();

    let reconciler = Reconciler::new(store.clone(), *coordinator.aggregator());
    let report = reconciler.reconcile_all().await.unwrap();
    assert_eq!(report.changed.len(), 1);

    let item = store.find_item(ITEM).await.unwrap().unwrap();
    assert_eq!(item.rating, 3.0);
    assert_eq!(item.rating_count, Some(2));
    assert_eq!(item.reviews.len(), 2);
}
