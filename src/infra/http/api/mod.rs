pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{delete, get, put},
};

pub fn build_api_router() -> Router<ApiState> {
    Router::new()
        .route(
            "/ingredients",
            get(handlers::list_ingredients).post(handlers::create_ingredients),
        )
        .route("/ingredient", get(handlers::get_ingredient))
        .route(
            "/ingredients/{key}",
            put(handlers::update_ingredient)
                .delete(handlers::delete_ingredient_by_name),
        )
        .route("/ingredients/id/{id}", delete(handlers::delete_ingredient))
        .route(
            "/recipes",
            get(handlers::list_recipes).post(handlers::create_recipes),
        )
        .route(
            "/recipes/{id}",
            get(handlers::get_recipe).delete(handlers::delete_recipe),
        )
        .route("/ws", get(handlers::connect_realtime))
}
