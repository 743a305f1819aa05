// Recipe client - offline stand-in for the recipe service
//
// Every call sleeps for a fixed delay on a spawned task and then builds
// recipes from templates. Nothing goes over the network.
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

use crate::models::Recipe;

const DEFAULT_DELAY_MS: u64 = 1000;
const IMAGE_BASE: &str = "https://picsum.photos/312/231";

#[derive(Error, Debug)]
pub enum RecipeApiError {
    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Recipe worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, RecipeApiError>;

#[derive(Debug, Clone)]
pub struct RecipeClient {
    delay: Duration,
}

impl RecipeClient {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(DEFAULT_DELAY_MS))
    }

    /// Custom artificial latency. Tests use zero.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Recipes matching a free-text query
    pub async fn search_recipes(&self, query: &str) -> Result<Vec<Recipe>> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Err(RecipeApiError::EmptyQuery);
        }

        debug!("Searching recipes for '{}'", query);
        self.run(move || recipes_for_query(&query)).await
    }

    /// Recipes that use up the given ingredients. Only the first two
    /// ingredients end up in the titles.
    pub async fn find_by_ingredients(&self, ingredients: &[String]) -> Result<Vec<Recipe>> {
        let picked: Vec<String> = ingredients
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .take(2)
            .map(str::to_string)
            .collect();
        if picked.is_empty() {
            return Err(RecipeApiError::EmptyQuery);
        }

        let text = picked.join(" & ");
        debug!("Finding recipes for ingredients '{}'", text);
        self.run(move || recipes_for_ingredients(&text)).await
    }

    async fn run<F>(&self, build: F) -> Result<Vec<Recipe>>
    where
        F: FnOnce() -> Vec<Recipe> + Send + 'static,
    {
        let delay = self.delay;
        tokio::spawn(async move {
            sleep(delay).await;
            build()
        })
        .await
        .map_err(|e| RecipeApiError::Worker(e.to_string()))
    }
}

impl Default for RecipeClient {
    fn default() -> Self {
        Self::new()
    }
}

fn recipe(id: u32, title: String, minutes: u32, servings: u32, summary: String) -> Recipe {
    Recipe {
        id,
        title,
        image: format!("{}?random={}", IMAGE_BASE, id),
        ready_in_minutes: minutes,
        servings,
        summary: Some(summary),
    }
}

fn recipes_for_query(query: &str) -> Vec<Recipe> {
    let lower = query.to_lowercase();
    vec![
        recipe(
            1,
            format!("Quick {} Stir Fry", query),
            15,
            2,
            format!("A delicious and quick stir fry using fresh {}. Perfect for weeknight dinners!", lower),
        ),
        recipe(
            2,
            format!("{} Smoothie Bowl", query),
            10,
            1,
            "Healthy smoothie bowl perfect for breakfast. Packed with nutrients and flavor.".to_string(),
        ),
        recipe(
            3,
            format!("Roasted {}", query),
            25,
            4,
            format!("Simple roasted {} with herbs and spices. A classic preparation method.", lower),
        ),
        recipe(
            4,
            format!("{} Salad Supreme", query),
            8,
            2,
            format!("Fresh and crispy salad featuring {}. Light and refreshing.", lower),
        ),
    ]
}

fn recipes_for_ingredients(text: &str) -> Vec<Recipe> {
    let lower = text.to_lowercase();
    vec![
        recipe(
            10,
            format!("{} Fresh Salad", text),
            10,
            2,
            format!("Fresh salad using your {}. Perfect for using expiring ingredients!", lower),
        ),
        recipe(
            11,
            format!("{} Warming Soup", text),
            20,
            3,
            "Warming soup perfect for using up ingredients. Comfort food at its best.".to_string(),
        ),
        recipe(
            12,
            format!("{} Power Bowl", text),
            12,
            1,
            format!("Nutritious power bowl with {}. Healthy and satisfying.", lower),
        ),
    ]
}
