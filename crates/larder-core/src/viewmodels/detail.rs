// Detail screen for a single item
use larder_store::{FoodItem, WasteLog, WasteReason};
use serde::Serialize;
use tracing::warn;

use crate::expiry::{TrackedItem, DEFAULT_WARNING_DAYS};
use crate::repository::FoodRepository;
use crate::viewmodels::form::FoodForm;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FoodDetailUiState {
    pub food_item: Option<TrackedItem>,
    /// Set once the item has left the larder (deleted or wasted)
    pub removed: bool,
    pub error: Option<String>,
}

pub struct FoodDetailViewModel {
    repo: FoodRepository,
    id: String,
    warning_days: u32,
    item: Option<FoodItem>,
    removed: bool,
    error: Option<String>,
}

impl FoodDetailViewModel {
    /// Load the item; a missing id is reported through `state().error`
    pub fn new(repo: FoodRepository, id: impl Into<String>) -> Self {
        let warning_days = match repo.settings() {
            Ok(settings) => settings.expiration_warning_days,
            Err(e) => {
                warn!("Falling back to the default warning window: {}", e);
                DEFAULT_WARNING_DAYS
            }
        };
        let mut vm = Self {
            repo,
            id: id.into(),
            warning_days,
            item: None,
            removed: false,
            error: None,
        };
        vm.reload();
        vm
    }

    pub fn item(&self) -> Option<&FoodItem> {
        self.item.as_ref()
    }

    pub fn state(&self) -> FoodDetailUiState {
        let food_item = self
            .item
            .clone()
            .map(|item| TrackedItem::assess(item, self.repo.now(), self.warning_days));
        FoodDetailUiState {
            food_item,
            removed: self.removed,
            error: self.error.clone(),
        }
    }

    pub fn reload(&mut self) {
        match self.repo.food_item(&self.id) {
            Ok(Some(item)) => {
                self.item = Some(item);
                self.error = None;
            }
            Ok(None) => {
                self.item = None;
                self.error = Some("Food item not found".to_string());
            }
            Err(e) => {
                warn!("Loading {} failed: {}", self.id, e);
                self.error = Some(format!("Failed to load food item: {}", e));
            }
        }
    }

    /// Form prefilled with the loaded item
    pub fn edit_form(&self) -> Option<FoodForm> {
        self.item
            .as_ref()
            .map(|item| FoodForm::from_item(item, self.repo.now()))
    }

    pub fn update(&mut self, form: &FoodForm) -> Result<FoodItem> {
        let result = self
            .loaded()
            .and_then(|item| form.apply_to(&item, self.repo.now()))
            .and_then(|updated| {
                self.repo.update_food_item(&updated)?;
                Ok(updated)
            });
        let updated = self.record("update", result)?;
        self.reload();
        Ok(updated)
    }

    pub fn mark_as_consumed(&mut self) -> Result<bool> {
        let result = self
            .loaded()
            .and_then(|item| self.repo.mark_as_consumed(&item.id));
        let changed = self.record("mark item as consumed", result)?;
        self.reload();
        Ok(changed)
    }

    pub fn delete(&mut self) -> Result<()> {
        let result = self
            .loaded()
            .and_then(|item| self.repo.delete_food_item(&item));
        self.record("delete", result)?;
        self.item = None;
        self.removed = true;
        Ok(())
    }

    pub fn log_waste(&mut self, reason: WasteReason, estimated_value: Option<f64>) -> Result<WasteLog> {
        let result = self
            .loaded()
            .and_then(|item| self.repo.log_waste(&item, reason, estimated_value));
        let log = self.record("log waste for", result)?;
        self.item = None;
        self.removed = true;
        Ok(log)
    }

    fn loaded(&self) -> Result<FoodItem> {
        self.item
            .clone()
            .ok_or_else(|| Error::NotFound(self.id.clone()))
    }

    fn record<T>(&mut self, action: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.error = None,
            Err(e) => {
                warn!("Failed to {} {}: {}", action, self.id, e);
                self.error = Some(format!("Failed to {} food item: {}", action, e));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{DateTime, Duration, Utc};
    use larder_store::Store;
    use std::sync::Arc;

    fn setup() -> (FoodRepository, FoodItem) {
        let repo = FoodRepository::with_clock(
            Arc::new(Store::open_in_memory().unwrap()),
            Arc::new(FixedClock::new(
                DateTime::<Utc>::from_timestamp_millis(1_760_000_000_000).unwrap(),
            )),
        );
        let item = FoodItem::new("Salmon", "Meat", repo.now() + Duration::days(2))
            .with_quantity(2, "pieces")
            .purchased(repo.now());
        repo.add_food_item(&item).unwrap();
        (repo, item)
    }

    #[test]
    fn test_loads_item() {
        let (repo, item) = setup();
        let vm = FoodDetailViewModel::new(repo, item.id.clone());
        let state = vm.state();
        assert_eq!(state.food_item.unwrap().item, item);
        assert!(state.error.is_none());
        assert!(!state.removed);
    }

    #[test]
    fn test_missing_item_reports_not_found() {
        let (repo, _) = setup();
        let mut vm = FoodDetailViewModel::new(repo, "nope");
        assert_eq!(vm.state().error.as_deref(), Some("Food item not found"));
        assert!(vm.edit_form().is_none());
        assert!(matches!(vm.mark_as_consumed(), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_through_form() {
        let (repo, item) = setup();
        let mut vm = FoodDetailViewModel::new(repo.clone(), item.id.clone());

        let mut form = vm.edit_form().unwrap();
        assert_eq!(form.expires_in_days, "2");
        form.quantity = "1".into();
        form.expires_in_days = "5".into();
        let updated = vm.update(&form).unwrap();

        assert_eq!(updated.quantity, 1);
        assert_eq!(vm.item(), Some(&updated));
        assert_eq!(repo.require_food_item(&item.id).unwrap(), updated);
    }

    #[test]
    fn test_renaming_overdue_item_keeps_expiration() {
        let (repo, _) = setup();
        let soup = FoodItem::new("Soup", "Other", repo.now() - Duration::days(3));
        repo.add_food_item(&soup).unwrap();
        let mut vm = FoodDetailViewModel::new(repo.clone(), soup.id.clone());

        let mut form = vm.edit_form().unwrap();
        form.name = "Tomato Soup".into();
        let updated = vm.update(&form).unwrap();

        assert_eq!(updated.expires_at, soup.expires_at);
        let state = vm.state().food_item.unwrap();
        assert_eq!(state.item.name, "Tomato Soup");
        assert_eq!(state.status, crate::expiry::ExpiryStatus::Overdue);
    }

    #[test]
    fn test_invalid_form_keeps_item() {
        let (repo, item) = setup();
        let mut vm = FoodDetailViewModel::new(repo, item.id.clone());

        let mut form = vm.edit_form().unwrap();
        form.name = " ".into();
        assert!(matches!(vm.update(&form), Err(Error::ValidationError(_))));
        assert_eq!(vm.item(), Some(&item));
        assert!(vm.state().error.unwrap().starts_with("Failed to update"));
    }

    #[test]
    fn test_mark_consumed_reloads() {
        let (repo, item) = setup();
        let mut vm = FoodDetailViewModel::new(repo, item.id);

        assert!(vm.mark_as_consumed().unwrap());
        assert!(vm.item().unwrap().is_consumed());
        assert!(!vm.mark_as_consumed().unwrap());
    }

    #[test]
    fn test_delete_and_waste_mark_removed() {
        let (repo, item) = setup();
        let mut vm = FoodDetailViewModel::new(repo.clone(), item.id.clone());
        vm.delete().unwrap();
        assert!(vm.state().removed);
        assert!(repo.food_item(&item.id).unwrap().is_none());

        let other = FoodItem::new("Kale", "Vegetables", repo.now());
        repo.add_food_item(&other).unwrap();
        let mut vm = FoodDetailViewModel::new(repo.clone(), other.id.clone());
        let log = vm.log_waste(WasteReason::Spoiled, None).unwrap();
        assert_eq!(log.food_name, "Kale");
        assert!(vm.state().removed);
        assert!(vm.state().food_item.is_none());
    }
}
