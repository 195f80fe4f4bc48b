use serde::{Deserialize, Serialize};

use crate::domain::entities::Ingredient;
use crate::domain::object_id::ObjectId;

#[derive(Debug, Deserialize, Serialize)]
pub struct IngredientCreateRequest {
    pub name: String,
    pub calories_per_gram: i32,
}

/// Fields left out of the payload keep their stored value.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct IngredientUpdateRequest {
    pub name: Option<String>,
    pub calories_per_gram: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RecipeCreateRequest {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreatedResponse {
    pub ids: Vec<ObjectId>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IngredientUpdatedResponse {
    pub message: String,
    pub ingredient: Ingredient,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeletedResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IngredientLookupQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RealtimeQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}
