// Demo provider - bridges the offline RecipeClient with RecipeProvider
use async_trait::async_trait;
use larder_api::{Recipe, RecipeClient};
use std::time::Duration;

use crate::{
    recipes::{RecipeProvider, RecipeSummary},
    Result,
};

/// Wrapper around RecipeClient that implements RecipeProvider
pub struct DemoRecipeProvider {
    client: RecipeClient,
}

impl DemoRecipeProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            client: RecipeClient::with_delay(delay),
        }
    }
}

impl Default for DemoRecipeProvider {
    fn default() -> Self {
        Self {
            client: RecipeClient::new(),
        }
    }
}

#[async_trait]
impl RecipeProvider for DemoRecipeProvider {
    async fn search(&self, query: &str) -> Result<Vec<RecipeSummary>> {
        let recipes = self.client.search_recipes(query).await?;
        Ok(recipes.into_iter().map(recipe_to_summary).collect())
    }

    async fn by_ingredients(&self, ingredients: &[String]) -> Result<Vec<RecipeSummary>> {
        let recipes = self.client.find_by_ingredients(ingredients).await?;
        Ok(recipes.into_iter().map(recipe_to_summary).collect())
    }
}

/// Convert the client's recipe into our summary
fn recipe_to_summary(recipe: Recipe) -> RecipeSummary {
    RecipeSummary {
        id: recipe.id,
        title: recipe.title,
        image_url: recipe.image,
        duration_minutes: recipe.ready_in_minutes,
        servings: recipe.servings,
        description: recipe.summary,
    }
}
