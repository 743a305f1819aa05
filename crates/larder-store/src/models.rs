use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categories offered by the add/edit forms. Stored as free text, so
/// anything else is accepted too.
pub const CATEGORIES: &[&str] = &[
    "Fruits",
    "Vegetables",
    "Dairy",
    "Meat",
    "Pantry",
    "Frozen",
    "Other",
];

/// Units offered by the add/edit forms
pub const UNITS: &[&str] = &["pieces", "kg", "grams", "liters", "bottles", "packages"];

pub const DEFAULT_UNIT: &str = "pieces";

/// The settings table only ever holds this row
pub const SETTINGS_ID: i64 = 1;

/// A tracked food item
///
/// There is no separate `consumed` flag on the struct: an item is consumed
/// exactly when `consumed_at` is set. The table keeps both columns and a
/// CHECK constraint ties them together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub quantity: u32,
    pub unit: String,
    pub consumed_at: Option<DateTime<Utc>>,
    pub photo_path: Option<String>,
}

impl FoodItem {
    /// Fresh item with the usual defaults: one piece, purchased now
    pub fn new(name: impl Into<String>, category: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            category: category.into(),
            purchased_at: Utc::now(),
            expires_at,
            quantity: 1,
            unit: DEFAULT_UNIT.to_string(),
            consumed_at: None,
            photo_path: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32, unit: impl Into<String>) -> Self {
        self.quantity = quantity;
        self.unit = unit.into();
        self
    }

    pub fn purchased(mut self, at: DateTime<Utc>) -> Self {
        self.purchased_at = at;
        self
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

/// Why something ended up in the bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteReason {
    Expired,
    Spoiled,
    TooMuch,
    Other,
}

impl WasteReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteReason::Expired => "expired",
            WasteReason::Spoiled => "spoiled",
            WasteReason::TooMuch => "too_much",
            WasteReason::Other => "other",
        }
    }

    pub fn all() -> Vec<WasteReason> {
        vec![
            WasteReason::Expired,
            WasteReason::Spoiled,
            WasteReason::TooMuch,
            WasteReason::Other,
        ]
    }
}

impl std::fmt::Display for WasteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown waste reason '{0}' (expected expired, spoiled, too_much or other)")]
pub struct UnknownWasteReason(pub String);

impl std::str::FromStr for WasteReason {
    type Err = UnknownWasteReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "expired" => Ok(WasteReason::Expired),
            "spoiled" => Ok(WasteReason::Spoiled),
            "too_much" => Ok(WasteReason::TooMuch),
            "other" => Ok(WasteReason::Other),
            _ => Err(UnknownWasteReason(s.to_string())),
        }
    }
}

/// Immutable snapshot of an item at the moment it was thrown away
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteLog {
    pub id: String,
    /// Id of the food item this came from. Not a foreign key: the item row
    /// is deleted in the same transaction that writes this one.
    pub food_item_id: String,
    pub food_name: String,
    pub category: String,
    pub quantity: u32,
    pub unit: String,
    pub reason: WasteReason,
    pub wasted_at: DateTime<Utc>,
    pub estimated_value: Option<f64>,
}

impl WasteLog {
    pub fn snapshot(
        item: &FoodItem,
        reason: WasteReason,
        wasted_at: DateTime<Utc>,
        estimated_value: Option<f64>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            food_item_id: item.id.clone(),
            food_name: item.name.clone(),
            category: item.category.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            reason,
            wasted_at,
            estimated_value,
        }
    }
}

/// Aggregate over waste events since some instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WasteSummary {
    pub total_quantity: u64,
    pub events: u64,
    pub total_value: f64,
}

/// The single settings row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub notifications_enabled: bool,
    /// "HH:MM", local time
    pub daily_reminder_time: String,
    pub expiration_warning_days: u32,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            daily_reminder_time: "18:00".to_string(),
            expiration_warning_days: 3,
        }
    }
}
