// Statistics screen
use larder_store::{FoodItem, WasteSummary};
use serde::Serialize;

use crate::live::LiveQuery;
use crate::repository::{FoodRepository, ItemCounts};
use crate::Result;

/// Trailing window for the waste figures
pub const WASTE_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsUiState {
    pub active_items_count: u64,
    pub consumed_items_count: u64,
    pub expiring_items_count: u64,
    pub total_items_count: u64,
    pub waste: WasteSummary,
}

impl StatisticsUiState {
    /// Share of tracked items that got eaten, 0.0 when nothing is tracked
    pub fn consumption_rate(&self) -> f64 {
        if self.total_items_count == 0 {
            return 0.0;
        }
        self.consumed_items_count as f64 / self.total_items_count as f64
    }
}

pub struct StatisticsViewModel {
    counts: LiveQuery<ItemCounts>,
    expiring: LiveQuery<Vec<FoodItem>>,
    waste: LiveQuery<WasteSummary>,
}

impl StatisticsViewModel {
    pub fn new(repo: &FoodRepository) -> Result<Self> {
        let warning_days = repo.settings()?.expiration_warning_days;
        Ok(Self {
            counts: repo.watch_counts()?,
            expiring: repo.watch_expiring(warning_days)?,
            waste: repo.watch_recent_waste(WASTE_WINDOW_DAYS)?,
        })
    }

    pub fn state(&self) -> StatisticsUiState {
        let counts = self.counts.current();
        StatisticsUiState {
            active_items_count: counts.active,
            consumed_items_count: counts.consumed,
            expiring_items_count: self.expiring.current().len() as u64,
            total_items_count: counts.total(),
            waste: self.waste.current(),
        }
    }

    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            alive = self.counts.changed() => alive,
            alive = self.expiring.changed() => alive,
            alive = self.waste.changed() => alive,
        }
    }
}
