use anyhow::{Context, Result, anyhow, bail};
use catalog::{
    Category, ItemFilter, ItemId, MemoryStore, PageRequest, SubRatingKind, UserId, load_seed,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rand::seq::IndexedRandom;
use reviews::ReviewSubmission;
use server::{MarketplaceService, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

type Service = MarketplaceService<MemoryStore>;

/// trip-recs - travel marketplace reviews and recommendations
#[derive(Parser)]
#[command(name = "trip-recs")]
#[command(about = "Reviews and personalized recommendations over a travel catalog", long_about = None)]
struct Cli {
    /// Path to the JSON seed file
    #[arg(short, long, default_value = "data/seed.json")]
    data: PathBuf,

    /// Run the store in single-node mode (non-transactional review writes)
    #[arg(long)]
    no_transactions: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get the recommendation feed for a user
    Recommend {
        #[arg(long)]
        user_id: UserId,

        /// Show why each item was picked
        #[arg(long)]
        explain: bool,
    },

    /// Submit a review and show the item's updated rating
    Review {
        #[arg(long)]
        item_id: ItemId,

        #[arg(long)]
        user_id: UserId,

        #[arg(long, default_value = "anonymous")]
        user_name: String,

        /// Overall rating, 1 to 5
        #[arg(long)]
        rating: f64,

        #[arg(long)]
        comment: String,

        /// Sub-rating as kind=value, e.g. --sub taste=4 (repeatable)
        #[arg(long = "sub", value_parser = parse_sub_rating)]
        sub_ratings: Vec<(SubRatingKind, f64)>,
    },

    /// List an item's reviews, newest first
    Reviews {
        #[arg(long)]
        item_id: ItemId,

        #[arg(long, default_value = "1")]
        page: usize,

        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Review statistics for an item
    Summary {
        #[arg(long)]
        item_id: ItemId,
    },

    /// Record clicks and show the resulting feed
    Click {
        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        item_id: ItemId,

        /// Number of clicks to record
        #[arg(long, default_value = "1")]
        times: u32,
    },

    /// Show a user's most clicked items
    User {
        #[arg(long)]
        user_id: UserId,
    },

    /// Browse the catalog
    Items {
        #[arg(long)]
        category: Option<Category>,

        /// Keep items carrying any of these tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        city: Option<String>,

        /// Case-insensitive search over name and description
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        min_price: Option<f64>,

        #[arg(long)]
        max_price: Option<f64>,

        #[arg(long, default_value = "1")]
        page: usize,

        #[arg(long, default_value = "10")]
        page_size: usize,
    },

    /// Rebuild rating aggregates from stored reviews
    Reconcile {
        /// Reconcile a single item instead of the whole catalog
        #[arg(long)]
        item_id: Option<ItemId>,
    },

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Loading seed data from {}...", cli.data.display());
    let start = Instant::now();
    let seed = load_seed(&cli.data).context("Failed to load seed data")?;
    let store = MemoryStore::new().with_transactions(!cli.no_transactions);
    let service = MarketplaceService::from_seed(seed, store, ServiceConfig::from_env()?).await?;
    println!("{} Loaded seed data in {:?}", "✓".green(), start.elapsed());

    match cli.command {
        Commands::Recommend { user_id, explain } => handle_recommend(&service, user_id, explain).await?,
        Commands::Review {
            item_id,
            user_id,
            user_name,
            rating,
            comment,
            sub_ratings,
        } => {
            let mut submission = ReviewSubmission::new(item_id, user_id, user_name, rating, comment);
            for (kind, value) in sub_ratings {
                submission = submission.with_sub_rating(kind, value);
            }
            handle_review(&service, &submission).await?
        }
        Commands::Reviews {
            item_id,
            page,
            page_size,
        } => handle_reviews(&service, item_id, page, page_size).await?,
        Commands::Summary { item_id } => handle_summary(&service, item_id).await?,
        Commands::Click {
            user_id,
            item_id,
            times,
        } => handle_click(&service, user_id, item_id, times).await?,
        Commands::User { user_id } => handle_user(&service, user_id).await?,
        Commands::Items {
            category,
            tags,
            city,
            search,
            min_price,
            max_price,
            page,
            page_size,
        } => {
            let mut filter = ItemFilter::all().price_between(min_price, max_price);
            if let Some(category) = category {
                filter = filter.category(category);
            }
            for tag in tags {
                filter = filter.tag(tag);
            }
            if let Some(city) = city {
                filter = filter.city(city);
            }
            if let Some(search) = search {
                filter = filter.text(search);
            }
            handle_items(&service, &filter, PageRequest::new(page, page_size)).await?
        }
        Commands::Reconcile { item_id } => handle_reconcile(&service, item_id).await?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(Arc::new(service), requests, concurrent).await?,
    }

    Ok(())
}

/// Parse `kind=value` for --sub
fn parse_sub_rating(raw: &str) -> Result<(SubRatingKind, f64), String> {
    let (kind, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected kind=value, got '{raw}'"))?;
    let kind = SubRatingKind::ALL
        .into_iter()
        .find(|k| k.as_str() == kind.trim())
        .ok_or_else(|| format!("unknown sub-rating '{kind}'"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid sub-rating value '{value}'"))?;
    Ok((kind, value))
}

async fn handle_recommend(service: &Service, user_id: UserId, explain: bool) -> Result<()> {
    let start = Instant::now();
    let recommendations = service.recommendations_or_popular(user_id).await?;

    println!(
        "{}",
        format!("Recommendations for user {user_id} ({:?}):", start.elapsed())
            .bold()
            .blue()
    );
    for (i, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} [{}] - {:.2} ({} reviews)",
            (i + 1).to_string().green(),
            rec.item.name,
            rec.item.category,
            rec.item.rating,
            rec.item.review_count()
        );
        if explain {
            println!("   {} {}", rec.source.cyan(), rec.explanation);
        }
    }
    Ok(())
}

async fn handle_review(service: &Service, submission: &ReviewSubmission) -> Result<()> {
    let review = match service.submit_review(submission).await {
        Ok(review) => review,
        Err(e) => bail!("{} {}", e.code().red(), e),
    };
    let item = service.get_item(review.item_id).await?;

    println!("{} Stored review {} for {}", "✓".green(), review.id, item.name.bold());
    println!(
        "{}Rating: {:.2} over {} reviews",
        "• ".cyan(),
        item.rating,
        item.review_count()
    );
    println!("{}Recent reviews on item: {}", "• ".cyan(), item.reviews.len());
    Ok(())
}

async fn handle_reviews(
    service: &Service,
    item_id: ItemId,
    page: usize,
    page_size: Option<usize>,
) -> Result<()> {
    let item = service.get_item(item_id).await?;
    let reviews = service.list_reviews(item_id, page, page_size).await?;

    println!(
        "{}",
        format!(
            "Reviews for {} (page {} of {}, {} total):",
            item.name,
            reviews.page,
            reviews.total_pages().max(1),
            reviews.total
        )
        .bold()
        .blue()
    );
    for review in &reviews.rows {
        println!(
            "  {} {} by {}: {}",
            "★".repeat(review.rating as usize).yellow(),
            review.id,
            review.user_name,
            review.comment
        );
        let subs: Vec<String> = review
            .sub_ratings
            .iter()
            .map(|(kind, value)| format!("{kind} {value}"))
            .collect();
        if !subs.is_empty() {
            println!("    {}", subs.join(", "));
        }
    }
    Ok(())
}

async fn handle_summary(service: &Service, item_id: ItemId) -> Result<()> {
    let item = service.get_item(item_id).await?;
    let summary = service.review_summary(item_id).await?;

    println!("{}", format!("Review summary for {}:", item.name).bold().blue());
    println!("{}Stored rating: {:.2}", "• ".green(), item.rating);
    println!("{}Reviews: {}", "• ".green(), summary.total_reviews);
    println!("{}Average rating: {:.2}", "• ".green(), summary.average_rating);
    for (kind, average) in &summary.sub_rating_averages {
        println!("  - {kind}: {average:.2}");
    }
    Ok(())
}

async fn handle_click(service: &Service, user_id: UserId, item_id: ItemId, times: u32) -> Result<()> {
    let item = service.get_item(item_id).await?;
    let mut count = 0;
    for _ in 0..times {
        count = service.record_click(user_id, item_id, None).await?;
    }
    println!(
        "{} User {} has clicked {} {} times",
        "✓".green(),
        user_id,
        item.name.bold(),
        count
    );
    handle_recommend(service, user_id, true).await
}

async fn handle_user(service: &Service, user_id: UserId) -> Result<()> {
    let export = service.export_training_data(user_id).await?;
    let stats = service.click_stats(user_id).await?;

    println!("{}", format!("User ID: {user_id}").bold().blue());
    let categories: Vec<String> = export
        .preferences
        .categories
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("{}Categories: {}", "• ".green(), categories.join(", "));
    let tags: Vec<&str> = export.preferences.tags.iter().map(String::as_str).collect();
    println!("{}Tags: {}", "• ".green(), tags.join(", "));
    println!("{}Purchases: {}", "• ".cyan(), export.purchase_history.len());
    println!("{}Views: {}", "• ".cyan(), export.view_history.len());

    println!("Most clicked items:");
    for stat in stats {
        let name = match service.get_item(stat.item_id).await {
            Ok(item) => item.name,
            Err(_) => format!("item {}", stat.item_id),
        };
        println!("  - {} ({} clicks)", name, stat.count);
    }
    Ok(())
}

async fn handle_items(service: &Service, filter: &ItemFilter, request: PageRequest) -> Result<()> {
    let page = service.browse_items(filter, request).await?;
    println!(
        "{}",
        format!(
            "Items (page {} of {}, {} matching):",
            page.page,
            page.total_pages().max(1),
            page.total
        )
        .bold()
        .blue()
    );
    for item in &page.rows {
        println!(
            "{}: {} [{}] {} - {:.2} ({} purchases) ¥{:.0}",
            item.id,
            item.name,
            item.category,
            item.location.city,
            item.rating,
            item.purchase_count,
            item.price
        );
    }
    Ok(())
}

async fn handle_reconcile(service: &Service, item_id: Option<ItemId>) -> Result<()> {
    let changed = match item_id {
        Some(item_id) => {
            let result = service.reconcile_item(item_id).await?;
            if result.changed { vec![result] } else { Vec::new() }
        }
        None => {
            let report = service.reconcile_all().await?;
            println!("Scanned {} items", report.scanned);
            report.changed
        }
    };

    if changed.is_empty() {
        println!("{} All aggregates already match stored reviews", "✓".green());
    }
    for result in changed {
        println!(
            "{} item {}: {:.2} -> {:.2} ({} reviews)",
            "↻".yellow(),
            result.item_id,
            result.previous_rating,
            result.rating,
            result.review_count
        );
    }
    Ok(())
}

async fn handle_benchmark(service: Arc<Service>, requests: usize, concurrent: usize) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be at least 1");
    }

    let user_ids: Vec<UserId> = service.store().snapshot().await.profiles.into_keys().collect();
    if user_ids.is_empty() {
        return Err(anyhow!("Seed data has no users to benchmark"));
    }

    let limiter = Arc::new(Semaphore::new(concurrent.max(1)));
    let mut rng = rand::rng();
    let mut handles = Vec::with_capacity(requests);
    let wall_clock = Instant::now();
    for _ in 0..requests {
        let user_id = *user_ids
            .choose(&mut rng)
            .ok_or_else(|| anyhow!("Seed data has no users to benchmark"))?;
        let service = service.clone();
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            let _permit = limiter.acquire_owned().await?;
            let start = Instant::now();
            service.get_recommendations(user_id).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings = Vec::with_capacity(requests);
    for handle in handles {
        timings.push(handle.await??);
    }
    let total_time = wall_clock.elapsed();

    timings.sort();
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {total_time:?}");
    println!("Average latency: {avg_latency:?}");
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} requests/second",
        requests as f64 / total_time.as_secs_f64()
    );
    Ok(())
}
