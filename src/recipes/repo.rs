use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub created_at: OffsetDateTime,
}

/// Field values for a recipe insert; relations are handled separately.
#[derive(Debug)]
pub struct NewRecipe<'a> {
    pub title: &'a str,
    pub time_minutes: i32,
    pub price: Decimal,
}

/// Raised when a referenced tag/ingredient id does not exist for this user.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} id")]
pub struct UnknownRelation {
    pub kind: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error(transparent)]
    Unknown(#[from] UnknownRelation),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl Tag {
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, user_id, name
            FROM tags
            WHERE user_id = $1
            ORDER BY name DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn create(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (user_id, name)
            VALUES ($1, $2)
            RETURNING id, user_id, name
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(db)
        .await?;
        Ok(tag)
    }

    /// Tags attached to one recipe, detail ordering.
    pub async fn for_recipe(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.user_id, t.name
            FROM tags t
            JOIN recipe_tags rt ON rt.tag_id = t.id
            WHERE rt.recipe_id = $1
            ORDER BY t.name DESC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

impl Ingredient {
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, user_id, name
            FROM ingredients
            WHERE user_id = $1
            ORDER BY name DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn create(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Ingredient> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (user_id, name)
            VALUES ($1, $2)
            RETURNING id, user_id, name
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(db)
        .await?;
        Ok(ingredient)
    }

    pub async fn for_recipe(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT i.id, i.user_id, i.name
            FROM ingredients i
            JOIN recipe_ingredients ri ON ri.ingredient_id = i.id
            WHERE ri.recipe_id = $1
            ORDER BY i.name DESC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

impl Recipe {
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, title, time_minutes, price, created_at
            FROM recipes
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Owner-scoped lookup; another user's recipe is indistinguishable from
    /// a missing one.
    pub async fn find_by_id(
        db: &PgPool,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> anyhow::Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, title, time_minutes, price, created_at
            FROM recipes
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(recipe_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(recipe)
    }

    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        fields: NewRecipe<'_>,
        tag_ids: &[Uuid],
        ingredient_ids: &[Uuid],
    ) -> Result<Recipe, RelationError> {
        let mut tx = db.begin().await?;
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (user_id, title, time_minutes, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, time_minutes, price, created_at
            "#,
        )
        .bind(user_id)
        .bind(fields.title)
        .bind(fields.time_minutes)
        .bind(fields.price)
        .fetch_one(&mut *tx)
        .await?;

        set_relations(&mut tx, user_id, recipe.id, tag_ids, ingredient_ids).await?;
        tx.commit().await?;
        Ok(recipe)
    }

    /// Update field values and, when id sets are given, replace the
    /// associated tag/ingredient sets wholesale.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        recipe_id: Uuid,
        title: Option<&str>,
        time_minutes: Option<i32>,
        price: Option<Decimal>,
        tag_ids: Option<&[Uuid]>,
        ingredient_ids: Option<&[Uuid]>,
    ) -> Result<Option<Recipe>, RelationError> {
        let mut tx = db.begin().await?;
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes
            SET title = COALESCE($3, title),
                time_minutes = COALESCE($4, time_minutes),
                price = COALESCE($5, price)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, time_minutes, price, created_at
            "#,
        )
        .bind(recipe_id)
        .bind(user_id)
        .bind(title)
        .bind(time_minutes)
        .bind(price)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(recipe) = recipe else {
            return Ok(None);
        };

        if let Some(tag_ids) = tag_ids {
            sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
                .bind(recipe.id)
                .execute(&mut *tx)
                .await?;
            link_tags(&mut tx, user_id, recipe.id, tag_ids).await?;
        }
        if let Some(ingredient_ids) = ingredient_ids {
            sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
                .bind(recipe.id)
                .execute(&mut *tx)
                .await?;
            link_ingredients(&mut tx, user_id, recipe.id, ingredient_ids).await?;
        }

        tx.commit().await?;
        Ok(Some(recipe))
    }

    /// Returns false when nothing owned by this user matched.
    pub async fn delete(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(recipe_id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Tag ids per recipe, in one round trip for a whole listing page.
    pub async fn tag_ids_for(
        db: &PgPool,
        recipe_ids: &[Uuid],
    ) -> anyhow::Result<HashMap<Uuid, Vec<Uuid>>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT recipe_id, tag_id
            FROM recipe_tags
            WHERE recipe_id = ANY($1)
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(db)
        .await?;
        Ok(group_pairs(rows))
    }

    pub async fn ingredient_ids_for(
        db: &PgPool,
        recipe_ids: &[Uuid],
    ) -> anyhow::Result<HashMap<Uuid, Vec<Uuid>>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT recipe_id, ingredient_id
            FROM recipe_ingredients
            WHERE recipe_id = ANY($1)
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(db)
        .await?;
        Ok(group_pairs(rows))
    }
}

fn group_pairs(rows: Vec<(Uuid, Uuid)>) -> HashMap<Uuid, Vec<Uuid>> {
    let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (recipe_id, related_id) in rows {
        map.entry(recipe_id).or_default().push(related_id);
    }
    map
}

async fn set_relations(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    recipe_id: Uuid,
    tag_ids: &[Uuid],
    ingredient_ids: &[Uuid],
) -> Result<(), RelationError> {
    link_tags(tx, user_id, recipe_id, tag_ids).await?;
    link_ingredients(tx, user_id, recipe_id, ingredient_ids).await?;
    Ok(())
}

/// Attach the given tag set. Every id must name a tag owned by this user;
/// duplicates in the input collapse to one link.
async fn link_tags(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    recipe_id: Uuid,
    tag_ids: &[Uuid],
) -> Result<(), RelationError> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    let inserted = sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, id FROM tags WHERE user_id = $2 AND id = ANY($3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(recipe_id)
    .bind(user_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await?;

    let distinct = distinct_count(tag_ids);
    if inserted.rows_affected() as usize != distinct {
        return Err(UnknownRelation { kind: "tag" }.into());
    }
    Ok(())
}

async fn link_ingredients(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    recipe_id: Uuid,
    ingredient_ids: &[Uuid],
) -> Result<(), RelationError> {
    if ingredient_ids.is_empty() {
        return Ok(());
    }
    let inserted = sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id)
        SELECT $1, id FROM ingredients WHERE user_id = $2 AND id = ANY($3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(recipe_id)
    .bind(user_id)
    .bind(ingredient_ids)
    .execute(&mut **tx)
    .await?;

    let distinct = distinct_count(ingredient_ids);
    if inserted.rows_affected() as usize != distinct {
        return Err(UnknownRelation { kind: "ingredient" }.into());
    }
    Ok(())
}

fn distinct_count(ids: &[Uuid]) -> usize {
    let mut seen: Vec<Uuid> = ids.to_vec();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_pairs_collects_per_recipe() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let map = group_pairs(vec![(a, t1), (a, t2), (b, t1)]);
        assert_eq!(map[&a].len(), 2);
        assert_eq!(map[&b], vec![t1]);
    }

    #[test]
    fn distinct_count_ignores_duplicates_and_order() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        assert_eq!(distinct_count(&[x, y, x, y, x]), 2);
        assert_eq!(distinct_count(&[]), 0);
    }
}
