use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{analytics, health, insights, rebalance};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/analytics", analytics::router())
        .nest("/api/rebalance", rebalance::router())
        .nest("/api/insights", insights::router())
        .layer(cors)
        .with_state(state)
}
