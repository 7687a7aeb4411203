//! Control interface for the Aeon engine.
//!
//! A small Axum HTTP server that lets test harnesses drive the engine
//! without waiting on the wall clock:
//!
//! - `POST /api/control/tick` forces a tick cycle for every started game.
//!   The route exists only when the engine runs in test mode.
//! - `GET /api/control/status` reports whether test mode is on.
//!
//! # Modules
//!
//! - [`error`] -- [`ControlApiError`] and its HTTP mapping
//! - [`handlers`] -- Route handlers
//! - [`router`] -- [`build_router`]
//! - [`server`] -- [`start_server`] with graceful shutdown
//! - [`state`] -- [`AppState`]
//!
//! [`ControlApiError`]: error::ControlApiError
//! [`build_router`]: router::build_router
//! [`start_server`]: server::start_server
//! [`AppState`]: state::AppState

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
