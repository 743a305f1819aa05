use serde::{Deserialize, Serialize};

use crate::Result;

/// What the recipe screens show for one recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: u32,
    pub title: String,
    pub image_url: String,
    pub duration_minutes: u32,
    pub servings: u32,
    pub description: Option<String>,
}

/// Trait for recipe sources
///
/// The shipped provider is offline; anything that can answer these two
/// questions can stand in for it.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecipeProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RecipeSummary>>;
    async fn by_ingredients(&self, ingredients: &[String]) -> Result<Vec<RecipeSummary>>;
}
