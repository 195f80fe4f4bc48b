use std::{error::Error as StdError, time::Duration};

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{
    application::repos::RepoError,
    domain::{error::DomainError, object_id::ObjectId, object_id::ObjectIdError},
    infra::error::InfraError,
};

/// Diagnostic payload attached to error responses and consumed by the
/// response-logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failures of the catalog services.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] ObjectIdError),
    #[error("recipe `{recipe}` has a malformed ingredient reference at {position}: {reason}")]
    InvalidReference {
        recipe: String,
        position: usize,
        reason: String,
    },
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("recipe {recipe} references missing ingredient {ingredient}")]
    DanglingReference {
        recipe: ObjectId,
        ingredient: ObjectId,
    },
    #[error("recipe expansion did not finish within {0:?}")]
    DeadlineExceeded(Duration),
    #[error("recipe expansion task failed: {0}")]
    Task(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl CatalogError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_the_source_chain() {
        let error = CatalogError::Repo(RepoError::from_persistence("connection reset"));
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);

        assert_eq!(report.messages[0], "persistence error: connection reset");
        assert_eq!(report.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_id_converts_from_parse_errors() {
        let err: CatalogError = ObjectId::parse_hex("x").unwrap_err().into();
        assert!(matches!(err, CatalogError::InvalidId(_)));
    }
}
