use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::recipes::repo::{Ingredient, Recipe, Tag};

#[derive(Debug, Serialize)]
pub struct TagRead {
    pub id: Uuid,
    pub name: String,
}

impl From<Tag> for TagRead {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngredientRead {
    pub id: Uuid,
    pub name: String,
}

impl From<Ingredient> for IngredientRead {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
        }
    }
}

/// Shared body for tag and ingredient creation.
#[derive(Debug, Deserialize)]
pub struct CreateNamedRequest {
    pub name: String,
}

impl CreateNamedRequest {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(ApiError::field("name", "This field may not be blank"));
        }
        Ok(())
    }
}

/// List/create shape: relations as bare ids.
#[derive(Debug, Serialize)]
pub struct RecipeListItem {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<Uuid>,
}

impl RecipeListItem {
    pub fn from_parts(recipe: Recipe, tags: Vec<Uuid>, ingredients: Vec<Uuid>) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            tags,
            ingredients,
        }
    }
}

/// Detail shape: relations as full nested objects.
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub tags: Vec<TagRead>,
    pub ingredients: Vec<IngredientRead>,
}

impl RecipeDetail {
    pub fn from_parts(recipe: Recipe, tags: Vec<Tag>, ingredients: Vec<Ingredient>) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            tags: tags.into_iter().map(Into::into).collect(),
            ingredients: ingredients.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub ingredients: Vec<Uuid>,
}

impl CreateRecipeRequest {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(ApiError::field("title", "This field may not be blank"));
        }
        if self.time_minutes < 0 {
            return Err(ApiError::field(
                "time_minutes",
                "Ensure this value is greater than or equal to 0",
            ));
        }
        if self.price.is_sign_negative() {
            return Err(ApiError::field(
                "price",
                "Ensure this value is greater than or equal to 0",
            ));
        }
        dedup_ids(&mut self.tags);
        dedup_ids(&mut self.ingredients);
        Ok(())
    }
}

/// Relation sets are order-independent; repeated ids collapse to one so the
/// response mirrors what actually gets associated.
fn dedup_ids(ids: &mut Vec<Uuid>) {
    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(*id));
}

/// PUT/PATCH body; absent fields keep their stored values, absent id sets
/// keep the stored associations.
#[derive(Debug, Deserialize)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<Uuid>>,
}

impl UpdateRecipeRequest {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        if let Some(title) = &mut self.title {
            *title = title.trim().to_string();
            if title.is_empty() {
                return Err(ApiError::field("title", "This field may not be blank"));
            }
        }
        if self.time_minutes.is_some_and(|m| m < 0) {
            return Err(ApiError::field(
                "time_minutes",
                "Ensure this value is greater than or equal to 0",
            ));
        }
        if self.price.is_some_and(|p| p.is_sign_negative()) {
            return Err(ApiError::field(
                "price",
                "Ensure this value is greater than or equal to 0",
            ));
        }
        if let Some(tags) = &mut self.tags {
            dedup_ids(tags);
        }
        if let Some(ingredients) = &mut self.ingredients {
            dedup_ids(ingredients);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    fn sample_recipe() -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Sample recipe".into(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn list_item_carries_ids_only() {
        let tag_id = Uuid::new_v4();
        let item = RecipeListItem::from_parts(sample_recipe(), vec![tag_id], vec![]);
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["tags"][0], serde_json::json!(tag_id));
        assert!(json["tags"][0].is_string());
        assert!(json["ingredients"].as_array().expect("array").is_empty());
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn detail_nests_full_objects() {
        let recipe = sample_recipe();
        let tag = Tag {
            id: Uuid::new_v4(),
            user_id: recipe.user_id,
            name: "Vegan".into(),
        };
        let ingredient = Ingredient {
            id: Uuid::new_v4(),
            user_id: recipe.user_id,
            name: "Kale".into(),
        };
        let detail = RecipeDetail::from_parts(recipe, vec![tag], vec![ingredient]);
        let json = serde_json::to_value(&detail).expect("serialize");
        assert_eq!(json["tags"][0]["name"], "Vegan");
        assert_eq!(json["ingredients"][0]["name"], "Kale");
        assert!(json["tags"][0].get("user_id").is_none());
    }

    #[test]
    fn create_rejects_blank_title() {
        let mut req = CreateRecipeRequest {
            title: "   ".into(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            tags: vec![],
            ingredients: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_rejects_negative_values() {
        let mut req = CreateRecipeRequest {
            title: "Soup".into(),
            time_minutes: -1,
            price: Decimal::new(500, 2),
            tags: vec![],
            ingredients: vec![],
        };
        assert!(req.validate().is_err());

        let mut req = CreateRecipeRequest {
            title: "Soup".into(),
            time_minutes: 1,
            price: Decimal::new(-500, 2),
            tags: vec![],
            ingredients: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_defaults_to_empty_relations() {
        let req: CreateRecipeRequest = serde_json::from_str(
            r#"{"title":"Sample recipe","time_minutes":10,"price":"5.00"}"#,
        )
        .expect("deserialize");
        assert!(req.tags.is_empty());
        assert!(req.ingredients.is_empty());
    }

    #[test]
    fn named_request_trims_and_rejects_blank() {
        let mut req = CreateNamedRequest {
            name: "  Vegan  ".into(),
        };
        req.validate().expect("valid");
        assert_eq!(req.name, "Vegan");

        let mut blank = CreateNamedRequest { name: " ".into() };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn create_collapses_duplicate_relation_ids() {
        let tag = Uuid::new_v4();
        let ingredient = Uuid::new_v4();
        let mut req = CreateRecipeRequest {
            title: "Soup".into(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            tags: vec![tag, tag, tag],
            ingredients: vec![ingredient, ingredient],
        };
        req.validate().expect("valid");
        assert_eq!(req.tags, vec![tag]);
        assert_eq!(req.ingredients, vec![ingredient]);
    }

    #[test]
    fn update_accepts_partial_body() {
        let mut req: UpdateRecipeRequest =
            serde_json::from_str(r#"{"title":"New title"}"#).expect("deserialize");
        req.validate().expect("valid");
        assert!(req.tags.is_none());
        assert!(req.price.is_none());
    }
}
