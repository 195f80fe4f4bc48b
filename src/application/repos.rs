//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{Ingredient, RecipeRecord};
use crate::domain::object_id::ObjectId;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub calories_per_gram: i32,
}

/// Partial update; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateIngredientParams {
    pub name: Option<String>,
    pub calories_per_gram: Option<i32>,
}

impl UpdateIngredientParams {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.calories_per_gram.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub name: String,
    pub ingredient_ids: Vec<ObjectId>,
}

#[async_trait]
pub trait IngredientsRepo: Send + Sync {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, RepoError>;

    async fn find_ingredient(&self, id: ObjectId) -> Result<Option<Ingredient>, RepoError>;
}

#[async_trait]
pub trait IngredientsWriteRepo: Send + Sync {
    /// Insert every document or none; returns the generated ids in input order.
    async fn insert_ingredients(
        &self,
        ingredients: Vec<NewIngredient>,
    ) -> Result<Vec<ObjectId>, RepoError>;

    async fn update_ingredient(
        &self,
        id: ObjectId,
        params: UpdateIngredientParams,
    ) -> Result<Option<Ingredient>, RepoError>;

    /// Delete at most one ingredient with this exact name; returns the deleted count.
    async fn delete_ingredient_by_name(&self, name: &str) -> Result<u64, RepoError>;

    async fn delete_ingredient(&self, id: ObjectId) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait RecipesRepo: Send + Sync {
    async fn list_recipes(&self) -> Result<Vec<RecipeRecord>, RepoError>;

    async fn find_recipe(&self, id: ObjectId) -> Result<Option<RecipeRecord>, RepoError>;
}

#[async_trait]
pub trait RecipesWriteRepo: Send + Sync {
    async fn insert_recipes(&self, recipes: Vec<NewRecipe>) -> Result<Vec<ObjectId>, RepoError>;

    async fn delete_recipe(&self, id: ObjectId) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
