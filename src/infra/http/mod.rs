pub mod api;
mod middleware;

pub use api::ApiState;
pub use middleware::{RequestContext, log_responses, set_request_context};

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Router, middleware as axum_middleware};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
};
use tracing::warn;

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::config::CorsSettings;

/// Full application router: catalog API, websocket endpoint, health check.
pub fn build_router(state: ApiState, cors: &CorsSettings) -> Router {
    api::build_api_router()
        .route("/_health/db", get(db_health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(cors))
}

fn cors_layer(cors: &CorsSettings) -> CorsLayer {
    let methods = [Method::GET, Method::PUT, Method::POST, Method::DELETE];
    if cors.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    target = "recipebox::http",
                    origin = %origin,
                    error = %err,
                    "ignoring unusable CORS origin"
                );
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

async fn db_health(State(state): State<ApiState>) -> Response {
    db_health_response(state.health.health_check().await)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
