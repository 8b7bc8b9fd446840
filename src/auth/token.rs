use rand::RngCore;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

/// Random bytes per token key; hex-encoded to a 40-char string.
const TOKEN_KEY_BYTES: usize = 20;

/// Opaque bearer token. One row per user; repeated logins hand back the
/// existing key.
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub key: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

pub fn generate_key() -> String {
    let mut buf = [0u8; TOKEN_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

impl AuthToken {
    /// Return the user's token, creating it on first login.
    pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> anyhow::Result<AuthToken> {
        if let Some(existing) = Self::find_by_user(db, user_id).await? {
            return Ok(existing);
        }

        // Lost races fall through to the existing row.
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (key, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(generate_key())
        .bind(user_id)
        .execute(db)
        .await?;

        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            SELECT key, user_id, created_at
            FROM auth_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;
        debug!(user_id = %user_id, "token issued");
        Ok(token)
    }

    pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<AuthToken>> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            SELECT key, user_id, created_at
            FROM auth_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(token)
    }

    /// Resolve a presented key to its owner.
    pub async fn resolve(db: &PgPool, key: &str) -> anyhow::Result<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id
            FROM auth_tokens
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(db)
        .await?;
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_40_hex_chars() {
        let key = generate_key();
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn keys_are_unique() {
        assert_ne!(generate_key(), generate_key());
    }
}
