use async_trait::async_trait;

use crate::{
    application::repos::{
        IngredientsRepo, IngredientsWriteRepo, NewIngredient, RepoError, UpdateIngredientParams,
    },
    domain::{entities::Ingredient, object_id::ObjectId},
};

use super::{PostgresRepositories, map_sqlx_error, object_id_from_column};

#[derive(sqlx::FromRow)]
struct IngredientRow {
    id: Vec<u8>,
    name: String,
    calories_per_gram: i32,
}

impl TryFrom<IngredientRow> for Ingredient {
    type Error = RepoError;

    fn try_from(row: IngredientRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: object_id_from_column(&row.id, "ingredients.id")?,
            name: row.name,
            calories_per_gram: row.calories_per_gram,
        })
    }
}

#[async_trait]
impl IngredientsRepo for PostgresRepositories {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, RepoError> {
        let rows = sqlx::query_as::<_, IngredientRow>(
            r#"
            SELECT id, name, calories_per_gram
            FROM ingredients
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(Ingredient::try_from).collect()
    }

    async fn find_ingredient(&self, id: ObjectId) -> Result<Option<Ingredient>, RepoError> {
        let row = sqlx::query_as::<_, IngredientRow>(
            r#"
            SELECT id, name, calories_per_gram
            FROM ingredients
            WHERE id = $1
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(Ingredient::try_from).transpose()
    }
}

#[async_trait]
impl IngredientsWriteRepo for PostgresRepositories {
    async fn insert_ingredients(
        &self,
        ingredients: Vec<NewIngredient>,
    ) -> Result<Vec<ObjectId>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let mut ids = Vec::with_capacity(ingredients.len());

        for ingredient in ingredients {
            let id = ObjectId::generate();
            sqlx::query(
                r#"
                INSERT INTO ingredients (id, name, calories_per_gram)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(id.as_bytes().as_slice())
            .bind(&ingredient.name)
            .bind(ingredient.calories_per_gram)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            ids.push(id);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(ids)
    }

    async fn update_ingredient(
        &self,
        id: ObjectId,
        params: UpdateIngredientParams,
    ) -> Result<Option<Ingredient>, RepoError> {
        let row = sqlx::query_as::<_, IngredientRow>(
            r#"
            UPDATE ingredients
            SET name = COALESCE($2, name),
                calories_per_gram = COALESCE($3, calories_per_gram)
            WHERE id = $1
            RETURNING id, name, calories_per_gram
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(params.name)
        .bind(params.calories_per_gram)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(Ingredient::try_from).transpose()
    }

    async fn delete_ingredient_by_name(&self, name: &str) -> Result<u64, RepoError> {
        let result = sqlx::query(
            r#"
            DELETE FROM ingredients
            WHERE id = (
                SELECT id FROM ingredients
                WHERE name = $1
                ORDER BY created_at, id
                LIMIT 1
            )
            "#,
        )
        .bind(name)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_ingredient(&self, id: ObjectId) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id.as_bytes().as_slice())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
