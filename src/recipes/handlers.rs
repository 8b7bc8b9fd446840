use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    recipes::{
        dto::{
            CreateNamedRequest, CreateRecipeRequest, IngredientRead, RecipeDetail,
            RecipeListItem, TagRead, UpdateRecipeRequest,
        },
        repo::{Ingredient, NewRecipe, Recipe, RelationError, Tag},
    },
    state::AppState,
};

// --- tags ---

#[instrument(skip(state))]
pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TagRead>>, ApiError> {
    let tags = Tag::list_by_user(&state.db, user_id).await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut payload): Json<CreateNamedRequest>,
) -> Result<(StatusCode, Json<TagRead>), ApiError> {
    payload.validate()?;
    let tag = Tag::create(&state.db, user_id, &payload.name).await?;
    info!(user_id = %user_id, tag_id = %tag.id, "tag created");
    Ok((StatusCode::CREATED, Json(tag.into())))
}

// --- ingredients ---

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<IngredientRead>>, ApiError> {
    let ingredients = Ingredient::list_by_user(&state.db, user_id).await?;
    Ok(Json(ingredients.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut payload): Json<CreateNamedRequest>,
) -> Result<(StatusCode, Json<IngredientRead>), ApiError> {
    payload.validate()?;
    let ingredient = Ingredient::create(&state.db, user_id, &payload.name).await?;
    info!(user_id = %user_id, ingredient_id = %ingredient.id, "ingredient created");
    Ok((StatusCode::CREATED, Json(ingredient.into())))
}

// --- recipes ---

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<RecipeListItem>>, ApiError> {
    let recipes = Recipe::list_by_user(&state.db, user_id).await?;
    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let mut tag_ids = Recipe::tag_ids_for(&state.db, &ids).await?;
    let mut ingredient_ids = Recipe::ingredient_ids_for(&state.db, &ids).await?;

    let items = recipes
        .into_iter()
        .map(|recipe| {
            let tags = tag_ids.remove(&recipe.id).unwrap_or_default();
            let ingredients = ingredient_ids.remove(&recipe.id).unwrap_or_default();
            RecipeListItem::from_parts(recipe, tags, ingredients)
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut payload): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeListItem>), ApiError> {
    payload.validate()?;

    let recipe = Recipe::create(
        &state.db,
        user_id,
        NewRecipe {
            title: &payload.title,
            time_minutes: payload.time_minutes,
            price: payload.price,
        },
        &payload.tags,
        &payload.ingredients,
    )
    .await
    .map_err(|e| relation_error(user_id, e))?;

    info!(user_id = %user_id, recipe_id = %recipe.id, "recipe created");
    Ok((
        StatusCode::CREATED,
        Json(RecipeListItem::from_parts(
            recipe,
            payload.tags,
            payload.ingredients,
        )),
    ))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = Recipe::find_by_id(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    let tags = Tag::for_recipe(&state.db, recipe.id).await?;
    let ingredients = Ingredient::for_recipe(&state.db, recipe.id).await?;
    Ok(Json(RecipeDetail::from_parts(recipe, tags, ingredients)))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetail>, ApiError> {
    payload.validate()?;

    let recipe = Recipe::update(
        &state.db,
        user_id,
        id,
        payload.title.as_deref(),
        payload.time_minutes,
        payload.price,
        payload.tags.as_deref(),
        payload.ingredients.as_deref(),
    )
    .await
    .map_err(|e| relation_error(user_id, e))?
    .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;

    let tags = Tag::for_recipe(&state.db, recipe.id).await?;
    let ingredients = Ingredient::for_recipe(&state.db, recipe.id).await?;
    info!(user_id = %user_id, recipe_id = %recipe.id, "recipe updated");
    Ok(Json(RecipeDetail::from_parts(recipe, tags, ingredients)))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !Recipe::delete(&state.db, user_id, id).await? {
        return Err(ApiError::NotFound("Recipe not found".into()));
    }
    info!(user_id = %user_id, recipe_id = %id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn relation_error(user_id: Uuid, err: RelationError) -> ApiError {
    match err {
        RelationError::Unknown(unknown) => {
            warn!(user_id = %user_id, kind = unknown.kind, "relation id not owned by user");
            match unknown.kind {
                "tag" => ApiError::field("tags", "Invalid tag id"),
                _ => ApiError::field("ingredients", "Invalid ingredient id"),
            }
        }
        RelationError::Db(e) => ApiError::Internal(e.into()),
    }
}
