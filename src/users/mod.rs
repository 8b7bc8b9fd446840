pub mod dto;
pub mod handlers;
pub mod repo;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(handlers::create_user))
        .route("/user/token", post(handlers::create_token))
        .route("/user/me", get(handlers::get_me).patch(handlers::update_me))
}
