// Screen state for the front ends
//
// Each view-model owns its live queries and exposes a plain snapshot through
// `state()`. Commands return `Result` and also leave the message in
// `state().error`, without touching the rest of the state.
pub mod detail;
pub mod form;
pub mod home;
pub mod recipes;
pub mod statistics;

pub use detail::{FoodDetailUiState, FoodDetailViewModel};
pub use form::{validate_reminder_time, FoodForm, ValidFood};
pub use home::{HomeUiState, HomeViewModel};
pub use recipes::{RecipeSection, RecipesUiState, RecipesViewModel};
pub use statistics::{StatisticsUiState, StatisticsViewModel};
