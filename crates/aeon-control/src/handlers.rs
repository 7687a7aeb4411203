//! Control REST handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/control/tick` | Tick every started game now (test mode only) |
//! | `GET` | `/api/control/status` | Whether test mode is on |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::info;

use crate::error::ControlApiError;
use crate::state::AppState;

/// Response body for `POST /api/control/tick`.
#[derive(Debug, serde::Serialize)]
struct ForceTickResponse {
    ok: bool,
    due: usize,
    ticked: usize,
    failed: usize,
    skipped: usize,
    busy: usize,
}

/// Response body for `GET /api/control/status`.
#[derive(Debug, serde::Serialize)]
struct StatusResponse {
    test_mode: bool,
}

/// Run one tick cycle for every started game, ignoring the tick interval,
/// and report how it went.
///
/// Returns 404 outside test mode even if the route is mounted.
pub async fn force_tick(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ControlApiError> {
    if !state.test_mode() {
        return Err(ControlApiError::NotFound(
            "forced ticks require test mode".to_owned(),
        ));
    }
    let report = state.trigger.force_tick().await?;
    info!(
        ticked = report.ticked,
        failed = report.failed,
        "Forced tick served"
    );
    Ok(Json(ForceTickResponse {
        ok: true,
        due: report.due,
        ticked: report.ticked,
        failed: report.failed,
        skipped: report.skipped,
        busy: report.busy,
    }))
}

/// Report whether the engine runs in test mode.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        test_mode: state.test_mode(),
    })
}
