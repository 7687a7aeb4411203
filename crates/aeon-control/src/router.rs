//! Axum router construction for the control interface.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the control router.
///
/// - `GET /api/control/status` -- always mounted
/// - `POST /api/control/tick` -- mounted only in test mode
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new().route("/api/control/status", get(handlers::status));
    if state.test_mode() {
        router = router.route("/api/control/tick", post(handlers::force_tick));
    }
    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
