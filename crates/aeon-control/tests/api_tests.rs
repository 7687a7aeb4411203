//! Integration tests for the control endpoints.
//!
//! Tests drive the `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use aeon_control::router::build_router;
use aeon_control::state::AppState;
use aeon_core::{
    ControlError, CycleReport, EngineConfig, GameRepository, InMemoryRepository, MapConfig,
    Scheduler, TickContext, TickTrigger,
};
use aeon_population::{PopulationTunables, SettlementDefaults};
use aeon_types::{Game, GameRecord, PlayerId};
use aeon_world::{MapGenConfig, SequentialSeeds};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

/// Counts forced ticks without touching any games.
struct StubTrigger {
    test_mode: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl TickTrigger for StubTrigger {
    fn test_mode(&self) -> bool {
        self.test_mode
    }

    async fn force_tick(&self) -> Result<CycleReport, ControlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CycleReport {
            started: 2,
            due: 2,
            ticked: 1,
            failed: 1,
            ..CycleReport::default()
        })
    }
}

fn stub(test_mode: bool) -> Arc<StubTrigger> {
    Arc::new(StubTrigger {
        test_mode,
        calls: AtomicUsize::new(0),
    })
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_tick() -> Request<Body> {
    Request::post("/api/control/tick")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn status_reports_test_mode() {
    for test_mode in [true, false] {
        let router = build_router(Arc::new(AppState::new(stub(test_mode))));
        let response = router
            .oneshot(
                Request::get("/api/control/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["test_mode"], test_mode);
    }
}

#[tokio::test]
async fn tick_route_is_absent_outside_test_mode() {
    let trigger = stub(false);
    let router = build_router(Arc::new(AppState::new(trigger.clone())));
    let response = router.oneshot(post_tick()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(trigger.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handler_rechecks_test_mode() {
    let trigger = stub(false);
    let state = Arc::new(AppState::new(trigger.clone()));
    let response = aeon_control::handlers::force_tick(axum::extract::State(state))
        .await
        .map(axum::response::IntoResponse::into_response)
        .unwrap_or_else(axum::response::IntoResponse::into_response);
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(trigger.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn forced_tick_reports_counts() {
    let trigger = stub(true);
    let router = build_router(Arc::new(AppState::new(trigger.clone())));
    let response = router.oneshot(post_tick()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["ticked"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["skipped"], 0);
    assert_eq!(trigger.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn forced_tick_advances_real_games() {
    let repo = Arc::new(InMemoryRepository::new());
    let now = Utc::now();
    let mut game = Game::new(PlayerId::new(), 4, -5000, now).unwrap();
    game.join(PlayerId::new()).unwrap();
    game.start(now).unwrap();
    repo.insert_game(GameRecord::from(game.clone())).await;

    let ctx = TickContext {
        map: MapConfig {
            width: 32,
            height: 32,
            generation: MapGenConfig {
                ocean_ratio: 0.0,
                ..MapGenConfig::default()
            },
        },
        settlement: SettlementDefaults::default(),
        population: PopulationTunables::default(),
        days_per_tick: 30,
        map_attempts: 2,
        seeds: Arc::new(SequentialSeeds::new(7)),
    };
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&repo) as Arc<dyn GameRepository>,
        ctx,
        &EngineConfig::default(),
        true,
    ));
    let router = build_router(Arc::new(AppState::new(scheduler)));

    for _ in 0..2 {
        let response = router.clone().oneshot(post_tick()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["ticked"], 1);
    }
    let record = repo.game(game.id()).await.unwrap();
    assert_eq!(record.current_year, -4998);
}
