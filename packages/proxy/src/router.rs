//! Assembles the Axum [`Router`] for the proxy.

use std::sync::Arc;

use axum::{routing::get, Router};
use nwfetch::Client;
use tower_http::trace::TraceLayer;

use crate::handlers::{frame, raw, AppState};

/// Build the proxy router around a shared client.
pub fn build_router(client: Arc<Client>) -> Router {
    let state = AppState { client };

    Router::new()
        .route("/raw", get(raw))
        .route("/", get(frame))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
