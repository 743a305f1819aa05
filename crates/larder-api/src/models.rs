use serde::{Deserialize, Serialize};

/// Recipe as the recipe service would send it
///
/// Field names follow the service's camelCase JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: u32,
    pub title: String,
    pub image: String,
    pub ready_in_minutes: u32,
    pub servings: u32,
    #[serde(default)]
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_service_payload() {
        let json = r#"{
            "id": 42,
            "title": "Tomato Soup",
            "image": "https://img.example/42.jpg",
            "readyInMinutes": 30,
            "servings": 4,
            "extendedIngredients": [{"id": 7, "name": "tomato"}]
        }"#;

        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.ready_in_minutes, 30);
        assert_eq!(recipe.summary, None);
        assert_eq!(recipe.title, "Tomato Soup");
    }
}
