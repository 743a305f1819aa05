// Recipes screen
//
// Suggestions come from the names of expiring items; the browse sections are
// one per category in the larder plus a couple of fixed ones.
use futures::future::try_join_all;
use larder_store::FoodItem;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::recipes::{RecipeProvider, RecipeSummary};
use crate::repository::FoodRepository;
use crate::Result;

/// Sections always shown after the user's own categories: (title, query)
pub const FIXED_SECTIONS: [(&str, &str); 2] = [("Quick Meals", "quick meals"), ("Healthy", "healthy")];

pub const FALLBACK_SECTION: &str = "Featured Recipes";
pub const FALLBACK_QUERY: &str = "general";
pub const FALLBACK_NOTE: &str = "Using demo recipes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSection {
    pub name: String,
    pub recipes: Vec<RecipeSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecipesUiState {
    pub expiring_items: Vec<FoodItem>,
    pub suggested_recipes: Vec<RecipeSummary>,
    pub sections: Vec<RecipeSection>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl RecipesUiState {
    pub fn section(&self, name: &str) -> Option<&RecipeSection> {
        self.sections.iter().find(|s| s.name == name)
    }
}

pub struct RecipesViewModel {
    repo: FoodRepository,
    provider: Arc<dyn RecipeProvider>,
    state: watch::Sender<RecipesUiState>,
}

impl RecipesViewModel {
    pub fn new(repo: FoodRepository, provider: Arc<dyn RecipeProvider>) -> Self {
        let (state, _) = watch::channel(RecipesUiState::default());
        Self { repo, provider, state }
    }

    pub fn state(&self) -> RecipesUiState {
        self.state.borrow().clone()
    }

    /// Follow loading progress
    pub fn subscribe(&self) -> watch::Receiver<RecipesUiState> {
        self.state.subscribe()
    }

    /// Fetch everything. If any lookup fails the screen falls back to one
    /// generic section and a note; only a failing fallback is an error.
    pub async fn load(&self) -> Result<()> {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        match self.fetch().await {
            Ok(loaded) => {
                info!(
                    "Loaded {} suggestions and {} recipe sections",
                    loaded.suggested_recipes.len(),
                    loaded.sections.len()
                );
                self.state.send_replace(loaded);
                Ok(())
            }
            Err(e) => {
                warn!("Recipe loading failed, falling back to demo recipes: {}", e);
                self.load_fallback().await
            }
        }
    }

    async fn fetch(&self) -> Result<RecipesUiState> {
        let warning_days = self.repo.settings()?.expiration_warning_days;
        let expiring_items = self.repo.expiring_items(warning_days)?;
        let categories = self.repo.active_categories()?;

        let names: Vec<String> = expiring_items.iter().map(|i| i.name.clone()).collect();
        let suggested = async {
            if names.is_empty() {
                Ok(Vec::new())
            } else {
                self.provider.by_ingredients(&names).await
            }
        };

        let mut queries: Vec<(String, String)> = categories.into_iter().map(|c| (c.clone(), c)).collect();
        queries.extend(
            FIXED_SECTIONS
                .iter()
                .map(|(name, query)| (name.to_string(), query.to_string())),
        );
        let sections = try_join_all(queries.into_iter().map(|(name, query)| async move {
            let recipes = self.provider.search(&query).await?;
            Ok::<_, crate::Error>(RecipeSection { name, recipes })
        }));

        let (suggested_recipes, sections) = futures::try_join!(suggested, sections)?;

        Ok(RecipesUiState {
            expiring_items,
            suggested_recipes,
            sections,
            is_loading: false,
            error: None,
        })
    }

    async fn load_fallback(&self) -> Result<()> {
        match self.provider.search(FALLBACK_QUERY).await {
            Ok(recipes) => {
                self.state.send_replace(RecipesUiState {
                    sections: vec![RecipeSection {
                        name: FALLBACK_SECTION.to_string(),
                        recipes,
                    }],
                    error: Some(FALLBACK_NOTE.to_string()),
                    ..RecipesUiState::default()
                });
                Ok(())
            }
            Err(e) => {
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::recipes::MockRecipeProvider;
    use crate::Error;
    use chrono::{DateTime, Duration, Utc};
    use larder_store::Store;

    fn repo() -> FoodRepository {
        FoodRepository::with_clock(
            Arc::new(Store::open_in_memory().unwrap()),
            Arc::new(FixedClock::new(
                DateTime::<Utc>::from_timestamp_millis(1_760_000_000_000).unwrap(),
            )),
        )
    }

    fn add(repo: &FoodRepository, name: &str, category: &str, days: i64) {
        repo.add_food_item(&FoodItem::new(name, category, repo.now() + Duration::days(days)))
            .unwrap();
    }

    fn recipe(title: &str) -> RecipeSummary {
        RecipeSummary {
            id: 1,
            title: title.to_string(),
            image_url: String::new(),
            duration_minutes: 10,
            servings: 2,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_sections_and_suggestions() {
        let repo = repo();
        add(&repo, "Spinach", "Vegetables", 1);
        add(&repo, "Yogurt", "Dairy", 2);
        add(&repo, "Rice", "Pantry", 90);

        let mut provider = MockRecipeProvider::new();
        provider
            .expect_by_ingredients()
            .withf(|names: &[String]| names.len() == 2 && names[0] == "Spinach" && names[1] == "Yogurt")
            .times(1)
            .returning(|_| Ok(vec![recipe("Spinach & Yogurt Fresh Salad")]));
        provider
            .expect_search()
            .times(5)
            .returning(|q| Ok(vec![recipe(&format!("Roasted {}", q))]));

        let vm = RecipesViewModel::new(repo, Arc::new(provider));
        vm.load().await.unwrap();
        let state = vm.state();

        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert_eq!(state.expiring_items.len(), 2);
        assert_eq!(state.suggested_recipes[0].title, "Spinach & Yogurt Fresh Salad");

        let names: Vec<_> = state.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Vegetables", "Dairy", "Pantry", "Quick Meals", "Healthy"]);
        assert_eq!(state.section("Quick Meals").unwrap().recipes[0].title, "Roasted quick meals");
    }

    #[tokio::test]
    async fn test_nothing_expiring_skips_suggestions() {
        let mut provider = MockRecipeProvider::new();
        provider.expect_by_ingredients().never();
        provider.expect_search().times(2).returning(|_| Ok(Vec::new()));

        let vm = RecipesViewModel::new(repo(), Arc::new(provider));
        vm.load().await.unwrap();
        let state = vm.state();
        assert!(state.suggested_recipes.is_empty());
        assert_eq!(state.sections.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_featured() {
        let mut provider = MockRecipeProvider::new();
        provider.expect_search().returning(|q| {
            if q == FALLBACK_QUERY {
                Ok(vec![recipe("Quick general Stir Fry")])
            } else {
                Err(Error::RecipeError("offline".into()))
            }
        });

        let vm = RecipesViewModel::new(repo(), Arc::new(provider));
        let mut updates = vm.subscribe();
        vm.load().await.unwrap();
        assert!(updates.has_changed().unwrap());

        let state = updates.borrow_and_update().clone();
        assert_eq!(state.error.as_deref(), Some(FALLBACK_NOTE));
        assert_eq!(state.sections.len(), 1);
        assert_eq!(state.sections[0].name, FALLBACK_SECTION);
        assert!(state.expiring_items.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_reported() {
        let mut provider = MockRecipeProvider::new();
        provider
            .expect_search()
            .returning(|_| Err(Error::RecipeError("offline".into())));

        let vm = RecipesViewModel::new(repo(), Arc::new(provider));
        assert!(vm.load().await.is_err());
        let state = vm.state();
        assert!(!state.is_loading);
        assert!(state.error.unwrap().contains("offline"));
    }

    #[tokio::test]
    async fn test_with_demo_provider() {
        let repo = repo();
        add(&repo, "Bananas", "Fruits", 2);
        let provider = crate::providers::DemoRecipeProvider::new(std::time::Duration::ZERO);

        let vm = RecipesViewModel::new(repo, Arc::new(provider));
        vm.load().await.unwrap();
        let state = vm.state();
        assert_eq!(state.suggested_recipes.len(), 3);
        assert_eq!(state.suggested_recipes[0].title, "Bananas Fresh Salad");
        assert_eq!(state.section("Fruits").unwrap().recipes[1].title, "Fruits Smoothie Bowl");
    }
}
