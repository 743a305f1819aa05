// SQLite storage for larder
// Food items, waste logs and the settings row, plus change notification
// so readers can refresh when something is written.

pub mod changes;
pub mod error;
pub mod models;
pub mod store;

pub use changes::{ChangeHub, Subscription, Table};
pub use error::{Result, StoreError};
pub use models::{
    FoodItem, UnknownWasteReason, UserSettings, WasteLog, WasteReason, WasteSummary, CATEGORIES,
    DEFAULT_UNIT, UNITS,
};
pub use store::{Store, SCHEMA_VERSION};
