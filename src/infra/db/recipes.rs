use async_trait::async_trait;

use crate::{
    application::repos::{NewRecipe, RecipesRepo, RecipesWriteRepo, RepoError},
    domain::{entities::RecipeRecord, object_id::ObjectId},
};

use super::{PostgresRepositories, map_sqlx_error, object_id_from_column};

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: Vec<u8>,
    name: String,
    ingredient_ids: Vec<Vec<u8>>,
}

impl TryFrom<RecipeRow> for RecipeRecord {
    type Error = RepoError;

    fn try_from(row: RecipeRow) -> Result<Self, Self::Error> {
        let ingredient_ids = row
            .ingredient_ids
            .iter()
            .map(|bytes| object_id_from_column(bytes, "recipes.ingredient_ids"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: object_id_from_column(&row.id, "recipes.id")?,
            name: row.name,
            ingredient_ids,
        })
    }
}

#[async_trait]
impl RecipesRepo for PostgresRepositories {
    async fn list_recipes(&self) -> Result<Vec<RecipeRecord>, RepoError> {
        let rows = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, name, ingredient_ids
            FROM recipes
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(RecipeRecord::try_from).collect()
    }

    async fn find_recipe(&self, id: ObjectId) -> Result<Option<RecipeRecord>, RepoError> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, name, ingredient_ids
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(RecipeRecord::try_from).transpose()
    }
}

#[async_trait]
impl RecipesWriteRepo for PostgresRepositories {
    async fn insert_recipes(&self, recipes: Vec<NewRecipe>) -> Result<Vec<ObjectId>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let mut ids = Vec::with_capacity(recipes.len());

        for recipe in recipes {
            let id = ObjectId::generate();
            let references: Vec<Vec<u8>> = recipe
                .ingredient_ids
                .iter()
                .map(|ingredient| ingredient.as_bytes().to_vec())
                .collect();

            sqlx::query(
                r#"
                INSERT INTO recipes (id, name, ingredient_ids)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(id.as_bytes().as_slice())
            .bind(&recipe.name)
            .bind(references)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            ids.push(id);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(ids)
    }

    async fn delete_recipe(&self, id: ObjectId) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id.as_bytes().as_slice())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
