pub mod health;
pub mod reports;

use axum::Router;
use axum::routing::get;

use crate::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health))
        .route(
            "/api/generate",
            get(reports::generate_from_query).post(reports::generate_from_body),
        )
}
