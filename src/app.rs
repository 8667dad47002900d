use crate::config;
use crate::state;

use axum::Router;
use axum::routing::{get, post};

mod push;

pub fn app(config: config::AppConfig) -> Router {
    router(state::AppState::new(config))
}

pub(crate) fn router(state: state::AppState) -> Router {
    Router::new()
        .route("/register", post(push::register))
        .route("/broadcast", post(push::broadcast))
        .route("/api/push/public-key", get(push::public_key))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
