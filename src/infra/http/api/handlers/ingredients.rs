//! Ingredient handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use url::form_urlencoded;

use crate::application::ingredients::{CreateIngredientCommand, UpdateIngredientCommand};

use super::catalog_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_ingredients(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state
        .ingredients
        .list_ingredients()
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(listing))
}

pub async fn get_ingredient(
    State(state): State<ApiState>,
    Query(query): Query<IngredientLookupQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(id) = query.id.filter(|id| !id.trim().is_empty()) else {
        return Err(ApiError::bad_request(
            "missing query parameter",
            Some("`id` is required".to_string()),
        ));
    };

    let ingredient = state
        .ingredients
        .get_ingredient(&id)
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(ingredient))
}

pub async fn create_ingredients(
    State(state): State<ApiState>,
    Json(payload): Json<Vec<IngredientCreateRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let commands = payload
        .into_iter()
        .map(|item| CreateIngredientCommand {
            name: item.name,
            calories_per_gram: item.calories_per_gram,
        })
        .collect();

    let ids = state
        .ingredients
        .create_ingredients(commands)
        .await
        .map_err(catalog_to_api)?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { ids })))
}

pub async fn update_ingredient(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<IngredientUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ingredient = state
        .ingredients
        .update_ingredient(UpdateIngredientCommand {
            id,
            name: payload.name,
            calories_per_gram: payload.calories_per_gram,
        })
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(IngredientUpdatedResponse {
        message: "ingredient updated".to_string(),
        ingredient,
    }))
}

pub async fn delete_ingredient_by_name(
    State(state): State<ApiState>,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let raw = uri.path().rsplit('/').next().unwrap_or_default();
    let name = decode_name_segment(raw);
    state
        .ingredients
        .delete_ingredient_by_name(&name)
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(DeletedResponse {
        message: "ingredient deleted".to_string(),
        id: None,
        name: Some(name),
    }))
}

pub async fn delete_ingredient(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .ingredients
        .delete_ingredient(&id)
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(DeletedResponse {
        message: "ingredient deleted".to_string(),
        id: Some(id.trim().to_ascii_lowercase()),
        name: None,
    }))
}

/// Decode a name taken from the path the way query values are decoded:
/// `+` is a space and `%XX` escapes are expanded.
fn decode_name_segment(raw: &str) -> String {
    let escaped = raw.replace('&', "%26").replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(name, _)| name.into_owned())
        .unwrap_or_default()
}
