//! Service configuration from environment variables.
//!
//! Every setting has a default; unset variables fall back to it and say
//! so in the log. A set but unparsable value is an error.

use anyhow::{Context, Result, bail};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub const MAX_EMBEDDED_REVIEWS: &str = "TRIP_MAX_EMBEDDED_REVIEWS";
pub const WRITE_BUDGET_MS: &str = "TRIP_WRITE_BUDGET_MS";
pub const RECOMMENDATION_SIZE: &str = "TRIP_RECOMMENDATION_SIZE";
pub const CLICK_THRESHOLD: &str = "TRIP_CLICK_THRESHOLD";
pub const REVIEW_PAGE_SIZE: &str = "TRIP_REVIEW_PAGE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Size of the recent-review window kept on items
    pub max_embedded_reviews: usize,
    /// Review writes slower than this are logged; they are not cancelled
    pub write_budget: Duration,
    pub recommendation_size: usize,
    /// Minimum clicks for an item to count as a click affinity
    pub click_threshold: u32,
    /// Page size for review listings when the caller gives none
    pub review_page_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_embedded_reviews: 20,
            write_budget: Duration::from_millis(3_000),
            recommendation_size: 10,
            click_threshold: 3,
            review_page_size: 10,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            max_embedded_reviews: try_load(&lookup, MAX_EMBEDDED_REVIEWS, defaults.max_embedded_reviews)?,
            write_budget: Duration::from_millis(try_load(
                &lookup,
                WRITE_BUDGET_MS,
                defaults.write_budget.as_millis() as u64,
            )?),
            recommendation_size: try_load(&lookup, RECOMMENDATION_SIZE, defaults.recommendation_size)?,
            click_threshold: try_load(&lookup, CLICK_THRESHOLD, defaults.click_threshold)?,
            review_page_size: try_load(&lookup, REVIEW_PAGE_SIZE, defaults.review_page_size)?,
        };

        if config.recommendation_size == 0 {
            bail!("{RECOMMENDATION_SIZE} must be at least 1");
        }
        if config.review_page_size == 0 {
            bail!("{REVIEW_PAGE_SIZE} must be at least 1");
        }
        Ok(config)
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw:?}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
