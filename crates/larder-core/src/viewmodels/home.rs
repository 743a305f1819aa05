// Home screen: everything in the larder, with the expiring slice up top
use larder_store::{FoodItem, WasteReason};
use serde::Serialize;
use tracing::warn;

use crate::expiry::TrackedItem;
use crate::live::LiveQuery;
use crate::repository::FoodRepository;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomeUiState {
    pub food_items: Vec<TrackedItem>,
    pub expiring_items: Vec<TrackedItem>,
    pub active_items_count: usize,
    pub error: Option<String>,
}

pub struct HomeViewModel {
    repo: FoodRepository,
    warning_days: u32,
    active: LiveQuery<Vec<FoodItem>>,
    expiring: LiveQuery<Vec<FoodItem>>,
    error: Option<String>,
}

impl HomeViewModel {
    /// Subscribe to the active and expiring queries using the saved warning window
    pub fn new(repo: FoodRepository) -> Result<Self> {
        let warning_days = repo.settings()?.expiration_warning_days;
        let active = repo.watch_active()?;
        let expiring = repo.watch_expiring(warning_days)?;
        Ok(Self {
            repo,
            warning_days,
            active,
            expiring,
            error: None,
        })
    }

    pub fn warning_days(&self) -> u32 {
        self.warning_days
    }

    /// Current snapshot, assessed against the clock right now
    pub fn state(&self) -> HomeUiState {
        let now = self.repo.now();
        let food_items = TrackedItem::assess_all(self.active.current(), now, self.warning_days);
        let expiring_items = TrackedItem::assess_all(self.expiring.current(), now, self.warning_days);
        HomeUiState {
            active_items_count: food_items.len(),
            food_items,
            expiring_items,
            error: self.error.clone(),
        }
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn mark_as_consumed(&mut self, item: &FoodItem) -> Result<bool> {
        let result = self.repo.mark_as_consumed(&item.id);
        self.record(result)
    }

    pub fn delete(&mut self, item: &FoodItem) -> Result<()> {
        let result = self.repo.delete_food_item(item);
        self.record(result)
    }

    pub fn log_waste(&mut self, item: &FoodItem, reason: WasteReason, estimated_value: Option<f64>) -> Result<()> {
        let result = self.repo.log_waste(item, reason, estimated_value).map(|_| ());
        self.record(result)
    }

    /// Re-read the warning window and resubscribe
    pub fn refresh(&mut self) -> Result<()> {
        let result = self.resubscribe();
        self.record(result)
    }

    fn resubscribe(&mut self) -> Result<()> {
        let warning_days = self.repo.settings()?.expiration_warning_days;
        self.expiring = self.repo.watch_expiring(warning_days)?;
        self.active = self.repo.watch_active()?;
        self.warning_days = warning_days;
        Ok(())
    }

    /// Resolve once either list refreshes. `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            alive = self.active.changed() => alive,
            alive = self.expiring.changed() => alive,
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.error = None,
            Err(e) => {
                warn!("Home action failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::expiry::ExpiryStatus;
    use chrono::{DateTime, Duration, Utc};
    use larder_store::Store;
    use std::sync::Arc;

    fn setup() -> (FoodRepository, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            DateTime::<Utc>::from_timestamp_millis(1_760_000_000_000).unwrap(),
        ));
        let repo = FoodRepository::with_clock(Arc::new(Store::open_in_memory().unwrap()), clock.clone());
        (repo, clock)
    }

    fn add(repo: &FoodRepository, name: &str, days: i64) -> FoodItem {
        let item = FoodItem::new(name, "Other", repo.now() + Duration::days(days)).purchased(repo.now());
        repo.add_food_item(&item).unwrap();
        item
    }

    #[test]
    fn test_state_splits_expiring() {
        let (repo, _) = setup();
        add(&repo, "Milk", 7);
        add(&repo, "Bananas", 2);

        let vm = HomeViewModel::new(repo).unwrap();
        let state = vm.state();
        assert_eq!(state.active_items_count, 2);
        assert_eq!(state.food_items[0].item.name, "Bananas");
        assert_eq!(state.expiring_items.len(), 1);
        assert_eq!(state.expiring_items[0].status, ExpiryStatus::ExpiringSoon);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_commands_update_state() {
        let (repo, _) = setup();
        let bread = add(&repo, "Bread", 1);
        let eggs = add(&repo, "Eggs", 10);
        let cheese = add(&repo, "Cheese", 4);
        let mut vm = HomeViewModel::new(repo.clone()).unwrap();

        assert!(vm.mark_as_consumed(&bread).unwrap());
        vm.delete(&eggs).unwrap();
        vm.log_waste(&cheese, WasteReason::Spoiled, None).unwrap();

        assert_eq!(vm.state().active_items_count, 0);
        assert_eq!(repo.waste_logs().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_command_sets_error_keeps_state() {
        let (repo, _) = setup();
        add(&repo, "Milk", 2);
        let ghost = FoodItem::new("Ghost", "Other", repo.now());
        let mut vm = HomeViewModel::new(repo).unwrap();
        let before = vm.state();

        assert!(vm.delete(&ghost).is_err());
        let after = vm.state();
        assert_eq!(after.food_items, before.food_items);
        assert!(after.error.unwrap().contains("not found"));

        vm.clear_error();
        assert!(vm.state().error.is_none());
    }

    #[test]
    fn test_refresh_picks_up_new_window() {
        let (repo, _) = setup();
        add(&repo, "Cheese", 5);
        let mut vm = HomeViewModel::new(repo.clone()).unwrap();
        assert!(vm.state().expiring_items.is_empty());

        repo.set_warning_days(7).unwrap();
        vm.refresh().unwrap();
        assert_eq!(vm.warning_days(), 7);
        assert_eq!(vm.state().expiring_items.len(), 1);
    }

    #[test]
    fn test_days_left_follow_clock() {
        let (repo, clock) = setup();
        add(&repo, "Yogurt", 3);
        let vm = HomeViewModel::new(repo).unwrap();
        assert_eq!(vm.state().food_items[0].days_left, 3);

        clock.advance(Duration::days(4));
        let item = &vm.state().food_items[0];
        assert_eq!(item.days_left, -1);
        assert_eq!(item.status, ExpiryStatus::Overdue);
    }

    #[tokio::test]
    async fn test_changed_wakes_on_write() {
        let (repo, _) = setup();
        let mut vm = HomeViewModel::new(repo.clone()).unwrap();
        add(&repo, "Apple", 1);
        assert!(vm.changed().await);
        assert_eq!(vm.state().active_items_count, 1);
    }
}
