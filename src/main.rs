mod app;
mod auth;
mod config;
mod error;
mod recipes;
mod state;
mod users;

use tracing::{info, warn};

use crate::state::AppState;
use crate::users::repo::User;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipebox=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;
    sqlx::migrate!("./migrations").run(&state.db).await?;

    bootstrap_superuser(&state).await?;

    let (host, port) = (state.config.host.clone(), state.config.port);
    let app = app::build_app(state);
    app::serve(app, &host, port).await
}

/// Create the admin account when ADMIN_EMAIL/ADMIN_PASSWORD are set, so a
/// fresh deployment has a staff login without manual SQL.
async fn bootstrap_superuser(state: &AppState) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (
        std::env::var("ADMIN_EMAIL"),
        std::env::var("ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    let email = email.trim().to_lowercase();
    if email.is_empty() || password.is_empty() {
        warn!("ADMIN_EMAIL/ADMIN_PASSWORD set but empty; skipping superuser bootstrap");
        return Ok(());
    }

    let hash = auth::password::hash_password(&password)?;
    let user = User::ensure_superuser(&state.db, &email, &hash).await?;
    info!(user_id = %user.id, email = %user.email, "superuser ready");
    Ok(())
}
