//! # Server Crate
//!
//! The marketplace service facade, its configuration and error type.
//!
//! ## Main Components
//!
//! - **service**: `MarketplaceService`, every operation the request layer calls
//! - **orchestrator**: Per-request recommendation flow
//! - **activity**: Click, view, purchase and preference recording
//! - **config**: Environment configuration
//! - **error**: Service error taxonomy
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{MemoryStore, load_seed};
//! use server::{MarketplaceService, ServiceConfig};
//!
//! let seed = load_seed(Path::new("data/seed.json"))?;
//! let service =
//!     MarketplaceService::from_seed(seed, MemoryStore::new(), ServiceConfig::from_env()?).await?;
//! let feed = service.recommendations_or_popular(user_id).await?;
//! ```

pub mod activity;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod service;

pub use activity::{ActivityRecorder, CLICK_STATS_LIMIT, ClickStat, TrainingExport};
pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use orchestrator::RecommendationOrchestrator;
pub use service::MarketplaceService;
