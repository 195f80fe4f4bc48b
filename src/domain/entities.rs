//! Catalog entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};

use crate::domain::object_id::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: ObjectId,
    pub name: String,
    pub calories_per_gram: i32,
}

/// A stored recipe. Ingredient data is not embedded; only references are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub id: ObjectId,
    pub name: String,
    pub ingredient_ids: Vec<ObjectId>,
}

/// Read-side view of a recipe with every reference resolved, in reference order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedRecipe {
    pub id: ObjectId,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
}
