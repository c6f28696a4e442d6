//! User activity recording: clicks, views, purchases and preferences.
//!
//! Profiles are read-then-write documents; concurrent writers to the same
//! profile are last-writer-wins.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use catalog::{
    ClickRecord, ItemId, Preferences, PurchaseRecord, Store, Timestamp, UserId, UserProfile,
    ViewRecord, now_millis,
};

use crate::error::{Result, ServiceError};

/// Maximum number of entries returned by click statistics
pub const CLICK_STATS_LIMIT: usize = 20;

/// One row of a user's click statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickStat {
    pub item_id: ItemId,
    pub count: u32,
    pub last_click_at: Timestamp,
}

/// Everything recorded about a user, as handed to model training
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingExport {
    pub user_id: UserId,
    pub preferences: Preferences,
    pub purchase_history: Vec<PurchaseRecord>,
    pub view_history: Vec<ViewRecord>,
    pub click_history: Vec<ClickStat>,
    pub exported_at: Timestamp,
}

pub struct ActivityRecorder<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> ActivityRecorder<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Count a click and return the item's new click count for the user
    pub async fn record_click(
        &self,
        user_id: UserId,
        item_id: ItemId,
        at: Option<Timestamp>,
    ) -> Result<u32> {
        let mut profile = self.load_profile(user_id).await?;
        let count = profile.record_click(item_id, at.unwrap_or_else(now_millis));
        self.store.save_profile(&profile).await?;
        debug!("User {} clicked item {} ({} times)", user_id, item_id, count);
        Ok(count)
    }

    pub async fn record_view(
        &self,
        user_id: UserId,
        item_id: ItemId,
        duration_secs: u32,
        at: Option<Timestamp>,
    ) -> Result<()> {
        let mut profile = self.load_profile(user_id).await?;
        profile.view_history.push(ViewRecord {
            item_id,
            viewed_at: at.unwrap_or_else(now_millis),
            duration_secs,
        });
        self.store.save_profile(&profile).await?;
        Ok(())
    }

    /// Append to the purchase history and bump the item's purchase counter
    pub async fn record_purchase(
        &self,
        user_id: UserId,
        item_id: ItemId,
        at: Option<Timestamp>,
    ) -> Result<PurchaseRecord> {
        let (mut profile, mut item) = tokio::try_join!(self.load_profile(user_id), async {
            self.store
                .find_item(item_id)
                .await?
                .ok_or(ServiceError::ItemNotFound(item_id))
        })?;

        let record = PurchaseRecord {
            item_id,
            item_name: item.name.clone(),
            category: item.category,
            price: item.price,
            purchased_at: at.unwrap_or_else(now_millis),
        };
        profile.purchase_history.push(record.clone());
        item.purchase_count = item.purchase_count.saturating_add(1);

        self.store.save_profile(&profile).await?;
        self.store.save_item(&item).await?;
        info!("User {} purchased item {}", user_id, item_id);
        Ok(record)
    }

    /// Replace the user's preferences
    pub async fn update_preferences(
        &self,
        user_id: UserId,
        preferences: Preferences,
    ) -> Result<Preferences> {
        if let Some(range) = preferences.price_range {
            if range.min > range.max {
                return Err(ServiceError::ValidationFailed(format!(
                    "price range min {} exceeds max {}",
                    range.min, range.max
                )));
            }
        }

        let mut profile = self.load_profile(user_id).await?;
        profile.preferences = preferences;
        self.store.save_profile(&profile).await?;
        Ok(profile.preferences)
    }

    /// Most clicked items first, at most [`CLICK_STATS_LIMIT`]
    pub async fn click_stats(&self, user_id: UserId) -> Result<Vec<ClickStat>> {
        let profile = self.load_profile(user_id).await?;
        let mut stats = sorted_clicks(&profile);
        stats.truncate(CLICK_STATS_LIMIT);
        Ok(stats)
    }

    pub async fn export_training_data(&self, user_id: UserId) -> Result<TrainingExport> {
        let profile = self.load_profile(user_id).await?;
        let click_history = sorted_clicks(&profile);
        Ok(TrainingExport {
            user_id,
            preferences: profile.preferences,
            purchase_history: profile.purchase_history,
            view_history: profile.view_history,
            click_history,
            exported_at: now_millis(),
        })
    }

    async fn load_profile(&self, user_id: UserId) -> Result<UserProfile> {
        self.store
            .find_profile(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))
    }
}

fn sorted_clicks(profile: &UserProfile) -> Vec<ClickStat> {
    let mut stats: Vec<ClickStat> = profile
        .click_history
        .iter()
        .map(|(item_id, ClickRecord { count, last_click_at })| ClickStat {
            item_id: *item_id,
            count: *count,
            last_click_at: *last_click_at,
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.item_id.cmp(&b.item_id)));
    stats
}
