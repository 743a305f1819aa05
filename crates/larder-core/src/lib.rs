// Larder's domain layer: everything between the database and a screen
pub mod clock;
pub mod config;
pub mod error;
pub mod expiry;
pub mod live;
pub mod providers;
pub mod recipes;
pub mod repository;
pub mod scheduler;
pub mod viewmodels;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::Error;
pub use expiry::{classify, days_until, ExpiryStatus, TrackedItem};
pub use live::LiveQuery;
pub use providers::DemoRecipeProvider;
pub use recipes::{RecipeProvider, RecipeSummary};
pub use repository::{FoodRepository, ItemCounts};
pub use scheduler::{
    ExpirationScheduler, ExpiryNotification, LogSink, NotificationSink, SchedulerRegistry,
    SchedulerState, TickOutcome,
};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
