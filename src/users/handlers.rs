use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        extractors::AuthUser,
        password::{hash_password, verify_password},
        token::AuthToken,
    },
    error::ApiError,
    state::AppState,
    users::{
        dto::{CreateUserRequest, TokenRequest, TokenResponse, UpdateMeRequest, UserResponse},
        repo::User,
    },
};

/// Uniform rejection for any credential mismatch. Never reveals whether the
/// email exists or which field was wrong.
const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials";

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let account = payload.validate()?;

    if User::find_by_email(&state.db, &account.email).await?.is_some() {
        warn!(email = %account.email, "email already registered");
        return Err(ApiError::field(
            "email",
            "A user with this email already exists",
        ));
    }

    let hash = hash_password(&account.password)?;
    let user = match User::create(&state.db, &account.email, &account.name, &hash).await {
        Ok(u) => u,
        // Concurrent create can still trip the unique index after the check.
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
            return Err(ApiError::field(
                "email",
                "A user with this email already exists",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    // Absent fields get the same rejection as wrong credentials.
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        warn!("token request with missing credential field");
        return Err(ApiError::BadRequest(INVALID_CREDENTIALS.into()));
    };
    let email = email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "token request for unknown email");
            return Err(ApiError::BadRequest(INVALID_CREDENTIALS.into()));
        }
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "token request with invalid password");
        return Err(ApiError::BadRequest(INVALID_CREDENTIALS.into()));
    }

    let token = AuthToken::get_or_create(&state.db, user.id).await?;
    info!(user_id = %user.id, "token issued");
    Ok(Json(TokenResponse { token: token.key }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate()?;

    let hash = match &payload.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    let user = User::update_profile(
        &state.db,
        user_id,
        payload.name.as_deref(),
        hash.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn token_with_missing_password_is_400() {
        let state = AppState::fake();
        let payload = TokenRequest {
            email: Some("test@test.com".into()),
            password: None,
        };
        let err = create_token(State(state), Json(payload)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn token_with_missing_email_is_400() {
        let state = AppState::fake();
        let payload = TokenRequest {
            email: None,
            password: Some("testpass".into()),
        };
        let err = create_token(State(state), Json(payload)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_user_with_missing_password_is_400() {
        let state = AppState::fake();
        let payload: CreateUserRequest =
            serde_json::from_str(r#"{"email":"test@test.com"}"#).expect("deserialize");
        let err = create_user(State(state), Json(payload)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
