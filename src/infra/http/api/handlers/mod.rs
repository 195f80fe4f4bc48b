//! API handlers organized by resource type.
//!
//! Helper functions for error conversion are defined here and shared across modules.

mod ingredients;
mod realtime;
mod recipes;

pub use ingredients::*;
pub use realtime::*;
pub use recipes::*;

use axum::http::StatusCode;

use crate::application::error::CatalogError;
use crate::application::repos::RepoError;

use super::error::{ApiError, codes};

const RETRY_AFTER_SECS: u64 = 1;

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        )
        .retry_after(RETRY_AFTER_SECS),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(message),
        ),
    }
}

pub(crate) fn catalog_to_api(err: CatalogError) -> ApiError {
    match err {
        CatalogError::InvalidId(inner) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_ID,
            "Invalid identifier",
            Some(inner.to_string()),
        ),
        err @ CatalogError::InvalidReference { .. } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_ID,
            "Invalid ingredient reference",
            Some(err.to_string()),
        ),
        CatalogError::Validation(inner) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(inner.to_string()),
        ),
        CatalogError::NotFound { entity } => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Resource not found",
            Some(format!("{entity} not found")),
        ),
        err @ CatalogError::DanglingReference { .. } => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::DANGLING_REFERENCE,
            "Recipe references a missing ingredient",
            Some(err.to_string()),
        ),
        err @ CatalogError::DeadlineExceeded(_) => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::EXPANSION_TIMEOUT,
            "Recipe expansion timed out",
            Some(err.to_string()),
        )
        .retry_after(RETRY_AFTER_SECS),
        CatalogError::Task(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::EXPANSION,
            "Recipe expansion failed",
            Some(message),
        ),
        CatalogError::Repo(repo) => repo_to_api(repo),
    }
}
