// Repository - the one door into storage
//
// Holds no entity state. Anything time-relative (the expiring threshold,
// consumption timestamps) is computed from the clock at call time.
use chrono::{DateTime, Utc};
use larder_store::{
    FoodItem, Store, Table, UserSettings, WasteLog, WasteReason, WasteSummary,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::expiry::{check_warning_days, warning_threshold, window_start};
use crate::live::LiveQuery;
use crate::Result;

/// Active/consumed tallies used by the statistics screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCounts {
    pub active: u64,
    pub consumed: u64,
}

impl ItemCounts {
    pub fn total(&self) -> u64 {
        self.active + self.consumed
    }
}

/// Façade over the store
///
/// Does not validate its input: names, quantities and the like are checked
/// by the forms before they get here.
#[derive(Clone)]
pub struct FoodRepository {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl FoodRepository {
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ---------------------------------------------------------------
    // Food items
    // ---------------------------------------------------------------

    pub fn add_food_item(&self, item: &FoodItem) -> Result<()> {
        self.store.insert_food_item(item)?;
        info!("Added {} x{} {}", item.name, item.quantity, item.unit);
        Ok(())
    }

    pub fn update_food_item(&self, item: &FoodItem) -> Result<()> {
        self.store.update_food_item(item)?;
        debug!("Updated food item {}", item.id);
        Ok(())
    }

    pub fn delete_food_item(&self, item: &FoodItem) -> Result<()> {
        self.store.delete_food_item(&item.id)?;
        info!("Deleted {}", item.name);
        Ok(())
    }

    /// Stamp the item consumed as of now
    ///
    /// `Ok(false)` if it was already consumed; the first timestamp stays.
    pub fn mark_as_consumed(&self, id: &str) -> Result<bool> {
        let changed = self.store.mark_consumed(id, self.now())?;
        if changed {
            info!("Marked {} as consumed", id);
        }
        Ok(changed)
    }

    pub fn food_item(&self, id: &str) -> Result<Option<FoodItem>> {
        Ok(self.store.food_item(id)?)
    }

    /// Like `food_item`, but a missing item is an error
    pub fn require_food_item(&self, id: &str) -> Result<FoodItem> {
        self.food_item(id)?
            .ok_or_else(|| crate::Error::NotFound(id.to_string()))
    }

    /// Non-consumed items, soonest expiration first
    pub fn active_items(&self) -> Result<Vec<FoodItem>> {
        Ok(self.store.active_food_items()?)
    }

    /// Non-consumed items expiring within `warning_days` of now
    pub fn expiring_items(&self, warning_days: u32) -> Result<Vec<FoodItem>> {
        let threshold = warning_threshold(self.now(), warning_days);
        Ok(self.store.expiring_food_items(threshold)?)
    }

    pub fn item_counts(&self) -> Result<ItemCounts> {
        Ok(ItemCounts {
            active: self.store.count_active()?,
            consumed: self.store.count_consumed()?,
        })
    }

    /// Distinct categories of active items, in expiration order
    pub fn active_categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = Vec::new();
        for item in self.active_items()? {
            if !categories.contains(&item.category) {
                categories.push(item.category);
            }
        }
        Ok(categories)
    }

    // ---------------------------------------------------------------
    // Waste
    // ---------------------------------------------------------------

    /// Snapshot the item into the waste log and delete it, atomically
    pub fn log_waste(
        &self,
        item: &FoodItem,
        reason: WasteReason,
        estimated_value: Option<f64>,
    ) -> Result<WasteLog> {
        let log = WasteLog::snapshot(item, reason, self.now(), estimated_value);
        self.store.record_waste(&log)?;
        Ok(log)
    }

    pub fn waste_logs(&self) -> Result<Vec<WasteLog>> {
        Ok(self.store.waste_logs(None)?)
    }

    pub fn waste_logs_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<WasteLog>> {
        Ok(self.store.waste_logs(Some((start, end)))?)
    }

    pub fn waste_summary_since(&self, start: DateTime<Utc>) -> Result<WasteSummary> {
        Ok(self.store.waste_summary_since(start)?)
    }

    /// Waste over the trailing `days` days
    pub fn recent_waste_summary(&self, days: u32) -> Result<WasteSummary> {
        self.waste_summary_since(window_start(self.now(), days))
    }

    // ---------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------

    /// Load the settings row, creating it with defaults on first use
    pub fn settings(&self) -> Result<UserSettings> {
        Ok(self.store.settings_or_default()?)
    }

    pub fn update_settings(&self, settings: &UserSettings) -> Result<()> {
        check_warning_days(settings.expiration_warning_days)?;
        self.store.save_settings(settings)?;
        info!("Saved settings: {:?}", settings);
        Ok(())
    }

    pub fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        Ok(self.store.set_notifications_enabled(enabled)?)
    }

    pub fn set_warning_days(&self, days: u32) -> Result<()> {
        Ok(self.store.set_warning_days(check_warning_days(days)?)?)
    }

    // ---------------------------------------------------------------
    // Live queries
    // ---------------------------------------------------------------

    pub fn watch_active(&self) -> Result<LiveQuery<Vec<FoodItem>>> {
        LiveQuery::new(&self.store, &[Table::FoodItems], |store| store.active_food_items())
    }

    /// Expiring items; the threshold is recomputed on every refresh
    pub fn watch_expiring(&self, warning_days: u32) -> Result<LiveQuery<Vec<FoodItem>>> {
        let clock = self.clock.clone();
        LiveQuery::new(&self.store, &[Table::FoodItems], move |store| {
            store.expiring_food_items(warning_threshold(clock.now(), warning_days))
        })
    }

    pub fn watch_counts(&self) -> Result<LiveQuery<ItemCounts>> {
        LiveQuery::new(&self.store, &[Table::FoodItems], |store| {
            Ok(ItemCounts {
                active: store.count_active()?,
                consumed: store.count_consumed()?,
            })
        })
    }

    pub fn watch_waste_logs(&self) -> Result<LiveQuery<Vec<WasteLog>>> {
        LiveQuery::new(&self.store, &[Table::WasteLogs], |store| store.waste_logs(None))
    }

    /// Waste over the trailing `days` days, window anchored at refresh time
    pub fn watch_recent_waste(&self, days: u32) -> Result<LiveQuery<WasteSummary>> {
        let clock = self.clock.clone();
        LiveQuery::new(&self.store, &[Table::WasteLogs], move |store| {
            store.waste_summary_since(window_start(clock.now(), days))
        })
    }
}
