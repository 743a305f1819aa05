// Recipe service client
// Mocked: recipes are synthesized locally after an artificial delay.
pub mod client;
pub mod models;

pub use client::{RecipeApiError, RecipeClient};
pub use models::Recipe;
