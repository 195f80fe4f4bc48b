use std::sync::Arc;

use tracing::{debug, info};

use crate::application::error::CatalogError;
use crate::application::repos::{
    IngredientsRepo, IngredientsWriteRepo, NewIngredient, UpdateIngredientParams,
};
use crate::cache::{ALL_INGREDIENTS_KEY, CatalogCaches};
use crate::domain::catalog::{ensure_non_negative_calories, normalize_name};
use crate::domain::entities::Ingredient;
use crate::domain::error::DomainError;
use crate::domain::object_id::ObjectId;

const ENTITY: &str = "ingredient";

#[derive(Debug, Clone)]
pub struct CreateIngredientCommand {
    pub name: String,
    pub calories_per_gram: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateIngredientCommand {
    pub id: String,
    pub name: Option<String>,
    pub calories_per_gram: Option<i32>,
}

#[derive(Clone)]
pub struct IngredientCatalogService {
    reader: Arc<dyn IngredientsRepo>,
    writer: Arc<dyn IngredientsWriteRepo>,
    caches: Arc<CatalogCaches>,
}

impl IngredientCatalogService {
    pub fn new(
        reader: Arc<dyn IngredientsRepo>,
        writer: Arc<dyn IngredientsWriteRepo>,
        caches: Arc<CatalogCaches>,
    ) -> Self {
        Self {
            reader,
            writer,
            caches,
        }
    }

    /// Full ingredient listing, served from the `allIngredients` cache entry
    /// when present.
    pub async fn list_ingredients(&self) -> Result<Arc<Vec<Ingredient>>, CatalogError> {
        if let Some(cached) = self.caches.ingredients.load(ALL_INGREDIENTS_KEY) {
            return Ok(cached);
        }

        let generation = self.caches.ingredients.generation(ALL_INGREDIENTS_KEY);
        let listing = Arc::new(self.reader.list_ingredients().await?);
        self.caches
            .ingredients
            .store_if_current(ALL_INGREDIENTS_KEY, generation, Arc::clone(&listing));
        debug!(
            target = "recipebox::application::ingredients",
            count = listing.len(),
            "ingredient listing loaded from store"
        );
        Ok(listing)
    }

    pub async fn get_ingredient(&self, raw_id: &str) -> Result<Ingredient, CatalogError> {
        let id = ObjectId::parse_hex(raw_id.trim())?;
        self.reader
            .find_ingredient(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(ENTITY))
    }

    pub async fn create_ingredients(
        &self,
        commands: Vec<CreateIngredientCommand>,
    ) -> Result<Vec<ObjectId>, CatalogError> {
        if commands.is_empty() {
            return Err(DomainError::validation("at least one ingredient is required").into());
        }

        let mut batch = Vec::with_capacity(commands.len());
        for command in commands {
            batch.push(NewIngredient {
                name: normalize_name(&command.name, "name")?,
                calories_per_gram: ensure_non_negative_calories(command.calories_per_gram)?,
            });
        }

        let ids = self.writer.insert_ingredients(batch).await?;
        self.invalidate_listings();
        info!(
            target = "recipebox::application::ingredients",
            count = ids.len(),
            "ingredients inserted"
        );
        Ok(ids)
    }

    pub async fn update_ingredient(
        &self,
        command: UpdateIngredientCommand,
    ) -> Result<Ingredient, CatalogError> {
        let id = ObjectId::parse_hex(command.id.trim())?;
        let params = UpdateIngredientParams {
            name: command
                .name
                .as_deref()
                .map(|name| normalize_name(name, "name"))
                .transpose()?,
            calories_per_gram: command
                .calories_per_gram
                .map(ensure_non_negative_calories)
                .transpose()?,
        };
        if params.is_empty() {
            return Err(DomainError::validation(
                "update must set name or calories_per_gram",
            )
            .into());
        }

        let updated = self
            .writer
            .update_ingredient(id, params)
            .await?
            .ok_or_else(|| CatalogError::not_found(ENTITY))?;
        self.invalidate_listings();
        info!(
            target = "recipebox::application::ingredients",
            ingredient_id = %updated.id,
            "ingredient updated"
        );
        Ok(updated)
    }

    pub async fn delete_ingredient_by_name(&self, name: &str) -> Result<(), CatalogError> {
        let deleted = self.writer.delete_ingredient_by_name(name).await?;
        if deleted == 0 {
            return Err(CatalogError::not_found(ENTITY));
        }
        self.invalidate_listings();
        info!(
            target = "recipebox::application::ingredients",
            name,
            "ingredient deleted by name"
        );
        Ok(())
    }

    pub async fn delete_ingredient(&self, raw_id: &str) -> Result<(), CatalogError> {
        let id = ObjectId::parse_hex(raw_id.trim())?;
        let deleted = self.writer.delete_ingredient(id).await?;
        if deleted == 0 {
            return Err(CatalogError::not_found(ENTITY));
        }
        self.invalidate_listings();
        info!(
            target = "recipebox::application::ingredients",
            ingredient_id = %id,
            "ingredient deleted"
        );
        Ok(())
    }

    // Expanded recipes embed ingredient data, so both listings go stale together.
    fn invalidate_listings(&self) {
        self.caches.invalidate_ingredients();
        self.caches.invalidate_recipes();
    }
}
