use axum::{extract::State, routing::get, Router};
use tracing::debug;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> &'static str {
    debug!("GET /health - provider={}", state.price_provider.name());
    "OK"
}
