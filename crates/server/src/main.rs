//! Test harness for the marketplace service.
//!
//! Seeds the in-memory store, submits a review and prints a user's feed.
//! Usage: `server [SEED_PATH] [USER_ID]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog::{MemoryStore, load_seed};
use reviews::ReviewSubmission;
use server::{MarketplaceService, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug,sources=debug,pipeline=debug")),
        )
        .init();

    info!("Starting marketplace service test harness");

    let mut args = std::env::args().skip(1);
    let seed_path = PathBuf::from(args.next().unwrap_or_else(|| "data/seed.json".to_string()));
    let user_id = match args.next() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid user id: {raw}"))?,
        None => 1,
    };

    let config = ServiceConfig::from_env()?;
    let seed = load_seed(&seed_path)
        .with_context(|| format!("Failed to load seed from {}", seed_path.display()))?;
    let service = MarketplaceService::from_seed(seed, MemoryStore::new(), config).await?;

    let recommendations = service.recommendations_or_popular(user_id).await?;
    info!("Received {} recommendations:", recommendations.len());
    for (i, rec) in recommendations.iter().enumerate() {
        info!(
            "{}. {} [{}] - {:.2} ({})",
            i + 1,
            rec.item.name,
            rec.item.category,
            rec.item.rating,
            rec.source
        );
        info!("   {}", rec.explanation);
    }

    if let Some(first) = recommendations.first() {
        let submission =
            ReviewSubmission::new(first.item.id, user_id, "harness", 5.0, "Loved it");
        let review = service.submit_review(&submission).await?;
        let item = service.get_item(first.item.id).await?;
        info!(
            "Stored review {} for {}; rating now {:.2} over {} reviews",
            review.id,
            item.name,
            item.rating,
            item.review_count()
        );
    }

    Ok(())
}
