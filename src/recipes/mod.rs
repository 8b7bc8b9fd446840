pub mod dto;
pub mod handlers;
pub mod repo;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/recipe/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route(
            "/recipe/ingredients",
            get(handlers::list_ingredients).post(handlers::create_ingredient),
        )
        .route(
            "/recipe/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .route(
            "/recipe/recipes/:id",
            get(handlers::get_recipe)
                .put(handlers::update_recipe)
                .patch(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
}
