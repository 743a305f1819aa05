// Add/edit form state and validation
//
// The repository trusts its input, so this is where bad input stops.
use chrono::{DateTime, Duration, NaiveTime, Utc};
use larder_store::{FoodItem, DEFAULT_UNIT};

use crate::expiry::days_until;
use crate::repository::FoodRepository;
use crate::{Error, Result};

pub const DEFAULT_EXPIRES_IN_DAYS: u32 = 7;

/// A century; anything longer is a typo
pub const MAX_EXPIRES_IN_DAYS: u32 = 36_500;

/// Raw form fields, as typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodForm {
    pub name: String,
    pub category: String,
    pub quantity: String,
    pub unit: String,
    /// Days from now; blank means the default week
    pub expires_in_days: String,
    pub photo_path: Option<String>,
    /// What `from_item` put in `expires_in_days`. While the field still
    /// holds it, an edit keeps the item's exact expiration.
    pub prefilled_expires_in_days: Option<String>,
}

impl Default for FoodForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: String::new(),
            quantity: "1".to_string(),
            unit: DEFAULT_UNIT.to_string(),
            expires_in_days: DEFAULT_EXPIRES_IN_DAYS.to_string(),
            photo_path: None,
            prefilled_expires_in_days: None,
        }
    }
}

/// Form contents that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFood {
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub unit: String,
    pub expires_in_days: u32,
    pub photo_path: Option<String>,
}

impl ValidFood {
    fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(i64::from(self.expires_in_days))
    }
}

impl FoodForm {
    /// Prefill from an existing item. Already-expired items show one day.
    pub fn from_item(item: &FoodItem, now: DateTime<Utc>) -> Self {
        let days = days_until(item.expires_at, now).max(1).to_string();
        Self {
            name: item.name.clone(),
            category: item.category.clone(),
            quantity: item.quantity.to_string(),
            unit: item.unit.clone(),
            expires_in_days: days.clone(),
            photo_path: item.photo_path.clone(),
            prefilled_expires_in_days: Some(days),
        }
    }

    pub fn validate(&self) -> Result<ValidFood> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::ValidationError("name must not be blank".into()));
        }

        let category = self.category.trim();
        if category.is_empty() {
            return Err(Error::ValidationError("category must not be blank".into()));
        }

        let quantity = match self.quantity.trim().parse::<u32>() {
            Ok(q) if q > 0 => q,
            _ => {
                return Err(Error::ValidationError(format!(
                    "quantity must be a positive whole number, got '{}'",
                    self.quantity
                )))
            }
        };

        let unit = match self.unit.trim() {
            "" => DEFAULT_UNIT.to_string(),
            u => u.to_string(),
        };

        let expires_in_days = match self.expires_in_days.trim() {
            "" => DEFAULT_EXPIRES_IN_DAYS,
            raw => match raw.parse::<u32>() {
                Ok(days) if days <= MAX_EXPIRES_IN_DAYS => days,
                _ => {
                    return Err(Error::ValidationError(format!(
                        "expiration must be a number of days up to {}, got '{}'",
                        MAX_EXPIRES_IN_DAYS, raw
                    )))
                }
            },
        };

        Ok(ValidFood {
            name: name.to_string(),
            category: category.to_string(),
            quantity,
            unit,
            expires_in_days,
            photo_path: self.photo_path.clone(),
        })
    }

    /// New item from the form, purchased `now`
    pub fn to_new_item(&self, now: DateTime<Utc>) -> Result<FoodItem> {
        let valid = self.validate()?;
        let mut item = FoodItem::new(valid.name.clone(), valid.category.clone(), valid.expires_at(now))
            .with_quantity(valid.quantity, valid.unit.clone())
            .purchased(now);
        item.photo_path = valid.photo_path;
        Ok(item)
    }

    /// Existing item with the editable fields replaced
    ///
    /// The expiration only moves if the days field was changed from its
    /// prefilled value.
    pub fn apply_to(&self, item: &FoodItem, now: DateTime<Utc>) -> Result<FoodItem> {
        let valid = self.validate()?;
        let untouched = self.prefilled_expires_in_days.as_deref() == Some(self.expires_in_days.trim());
        let expires_at = if untouched { item.expires_at } else { valid.expires_at(now) };
        Ok(FoodItem {
            name: valid.name,
            category: valid.category,
            quantity: valid.quantity,
            unit: valid.unit,
            expires_at,
            photo_path: valid.photo_path.or_else(|| item.photo_path.clone()),
            ..item.clone()
        })
    }

    /// Validate and store a new item
    pub fn submit(&self, repo: &FoodRepository) -> Result<FoodItem> {
        let item = self.to_new_item(repo.now())?;
        repo.add_food_item(&item)?;
        Ok(item)
    }
}

/// Check a "HH:MM" reminder time and normalize it
pub fn validate_reminder_time(raw: &str) -> Result<String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| Error::ValidationError(format!("reminder time must be HH:MM, got '{}'", raw)))
}
