//! Recipe handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::recipes::CreateRecipeCommand;

use super::catalog_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_recipes(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let expanded = state
        .recipes
        .expanded_recipes()
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(expanded))
}

pub async fn get_recipe(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recipe = state.recipes.get_recipe(&id).await.map_err(catalog_to_api)?;
    Ok(Json(recipe))
}

pub async fn create_recipes(
    State(state): State<ApiState>,
    Json(payload): Json<Vec<RecipeCreateRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let commands = payload
        .into_iter()
        .map(|item| CreateRecipeCommand {
            name: item.name,
            ingredient_ids: item.ingredients,
        })
        .collect();

    let ids = state
        .recipes
        .create_recipes(commands)
        .await
        .map_err(catalog_to_api)?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { ids })))
}

pub async fn delete_recipe(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .recipes
        .delete_recipe(&id)
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(DeletedResponse {
        message: "recipe deleted".to_string(),
        id: Some(id.trim().to_ascii_lowercase()),
        name: None,
    }))
}
