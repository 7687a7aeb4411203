//! Polling scheduler.
//!
//! Every poll interval the scheduler loads all started games, picks the
//! due ones, and spawns one tick task per game. Games tick concurrently;
//! a game whose previous tick is still running is skipped for the cycle.
//! One game failing never affects another.
//!
//! In test mode the control interface can force a cycle that ignores the
//! tick interval and waits for every tick it started.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use aeon_types::{Game, GameId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::clock::should_tick;
use crate::config::EngineConfig;
use crate::locks::{GameGuard, GameLocks};
use crate::repository::{GameRepository, RepositoryError, StartedGames};
use crate::tick::{TickContext, run_tick};

/// Errors that abandon a whole polling cycle.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Started games could not be loaded.
    #[error("failed to load started games: {source}")]
    Load {
        /// The underlying repository error.
        #[from]
        source: RepositoryError,
    },
}

/// Errors returned to the control interface.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Forcing ticks requires test mode.
    #[error("test mode is disabled")]
    TestModeDisabled,

    /// The forced cycle failed.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: SchedulerError,
    },
}

/// Counts for one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Started games loaded.
    pub started: usize,
    /// Games due (or forced) this cycle.
    pub due: usize,
    /// Ticks that committed.
    pub ticked: usize,
    /// Ticks that failed and were abandoned.
    pub failed: usize,
    /// Malformed or undecodable records passed over.
    pub skipped: usize,
    /// Due games whose previous tick was still running.
    pub busy: usize,
}

impl CycleReport {
    const fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Ticked => self.ticked = self.ticked.saturating_add(1),
            Outcome::Failed => self.failed = self.failed.saturating_add(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ticked,
    Failed,
}

/// Something that can force a tick cycle.
#[async_trait]
pub trait TickTrigger: Send + Sync {
    /// Whether forced ticks are allowed.
    fn test_mode(&self) -> bool;

    /// Tick every started game now and wait for the results.
    async fn force_tick(&self) -> Result<CycleReport, ControlError>;
}

/// Drives ticks for every started game.
pub struct Scheduler {
    repo: Arc<dyn GameRepository>,
    ctx: Arc<TickContext>,
    locks: Arc<GameLocks>,
    tick_interval: Duration,
    poll_interval: Duration,
    test_mode: bool,
}

impl Scheduler {
    /// Create a scheduler over `repo`.
    pub fn new(
        repo: Arc<dyn GameRepository>,
        ctx: TickContext,
        engine: &EngineConfig,
        test_mode: bool,
    ) -> Self {
        Self {
            repo,
            ctx: Arc::new(ctx),
            locks: Arc::new(GameLocks::new()),
            tick_interval: Duration::from_millis(engine.tick_interval_ms),
            poll_interval: Duration::from_millis(engine.poll_interval_ms),
            test_mode,
        }
    }

    /// The per-game lock arena.
    pub fn locks(&self) -> &GameLocks {
        &self.locks
    }

    /// Run one cycle at `now` and wait for every tick it started.
    pub async fn poll_once(&self, now: DateTime<Utc>) -> Result<CycleReport, SchedulerError> {
        self.cycle(now, false).await
    }

    async fn cycle(&self, now: DateTime<Utc>, force: bool) -> Result<CycleReport, SchedulerError> {
        let mut tasks = JoinSet::new();
        let mut report = self.dispatch(&mut tasks, now, force).await?;
        while let Some(joined) = tasks.join_next().await {
            report.record(settle(joined));
        }
        Ok(report)
    }

    /// Load started games and spawn a tick for each due one into `tasks`.
    async fn dispatch(
        &self,
        tasks: &mut JoinSet<Outcome>,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<CycleReport, SchedulerError> {
        let StartedGames {
            records,
            undecodable,
        } = self.repo.load_started_games().await?;
        let mut report = CycleReport {
            started: records.len().saturating_add(undecodable),
            skipped: undecodable,
            ..CycleReport::default()
        };
        let live: HashSet<GameId> = records.iter().map(|record| record.id).collect();
        for record in records {
            let game_id = record.id;
            let game = match Game::try_from(record) {
                Ok(game) => game,
                Err(err) => {
                    warn!(game_id = %game_id, error = %err, "skipping malformed game");
                    report.skipped = report.skipped.saturating_add(1);
                    continue;
                }
            };
            if !force && !should_tick(&game, now, self.tick_interval) {
                continue;
            }
            report.due = report.due.saturating_add(1);
            let Some(guard) = self.locks.try_acquire(game_id) else {
                debug!(game_id = %game_id, "tick still in flight; skipping");
                report.busy = report.busy.saturating_add(1);
                continue;
            };
            tasks.spawn(tick_game(
                Arc::clone(&self.repo),
                Arc::clone(&self.ctx),
                game,
                now,
                guard,
            ));
        }
        let pruned = self.locks.retain(&live);
        if pruned > 0 {
            debug!(pruned, "released locks of games no longer started");
        }
        Ok(report)
    }

    /// Poll until `shutdown` changes, then wait for in-flight ticks.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight = JoinSet::new();
        info!(
            poll_interval = ?self.poll_interval,
            tick_interval = ?self.tick_interval,
            test_mode = self.test_mode,
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    while let Some(joined) = in_flight.try_join_next() {
                        settle(joined);
                    }
                    match self.dispatch(&mut in_flight, Utc::now(), false).await {
                        Ok(report) if report.due > 0 || report.skipped > 0 => {
                            debug!(
                                due = report.due,
                                busy = report.busy,
                                skipped = report.skipped,
                                "ticks dispatched"
                            );
                        }
                        Ok(_) => {}
                        Err(err) => warn!(error = %err, "poll failed; retrying next cycle"),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        info!(in_flight = in_flight.len(), "scheduler stopping");
        while let Some(joined) = in_flight.join_next().await {
            settle(joined);
        }
        info!("scheduler stopped");
    }
}

#[async_trait]
impl TickTrigger for Scheduler {
    fn test_mode(&self) -> bool {
        self.test_mode
    }

    async fn force_tick(&self) -> Result<CycleReport, ControlError> {
        if !self.test_mode {
            return Err(ControlError::TestModeDisabled);
        }
        let report = self.cycle(Utc::now(), true).await?;
        info!(
            ticked = report.ticked,
            failed = report.failed,
            busy = report.busy,
            "forced tick cycle complete"
        );
        Ok(report)
    }
}

/// One game's tick task. The guard is held until the tick settles.
async fn tick_game(
    repo: Arc<dyn GameRepository>,
    ctx: Arc<TickContext>,
    game: Game,
    now: DateTime<Utc>,
    _guard: GameGuard,
) -> Outcome {
    let game_id = game.id();
    match run_tick(repo.as_ref(), &ctx, game, now).await {
        Ok(summary) => {
            info!(
                game_id = %game_id,
                year = summary.year,
                settlements = summary.settlements,
                settled = summary.settled,
                trained = summary.trained,
                total_population = summary.total_population,
                duration_ms = summary.duration_ms,
                "game ticked"
            );
            Outcome::Ticked
        }
        Err(err) if err.is_transient() => {
            warn!(game_id = %game_id, error = %err, "tick abandoned; retrying next cycle");
            Outcome::Failed
        }
        Err(err) => {
            error!(game_id = %game_id, error = %err, "tick failed");
            Outcome::Failed
        }
    }
}

fn settle(joined: Result<Outcome, JoinError>) -> Outcome {
    joined.unwrap_or_else(|err| {
        error!(error = %err, "tick task aborted");
        Outcome::Failed
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aeon_population::{SettlementDefaults, establish_settlement};
    use aeon_types::{GameRecord, Location};
    use chrono::TimeDelta;

    use super::*;
    use crate::memory::InMemoryRepository;
    use crate::tick::tests::{test_context, two_player_game};

    fn scheduler(repo: &Arc<InMemoryRepository>, test_mode: bool) -> Scheduler {
        let repo: Arc<dyn GameRepository> = Arc::clone(repo) as Arc<dyn GameRepository>;
        Scheduler::new(repo, test_context(), &EngineConfig::default(), test_mode)
    }

    async fn year_of(repo: &InMemoryRepository, game: &Game) -> i64 {
        repo.game(game.id()).await.unwrap().current_year
    }

    #[tokio::test]
    async fn due_game_ticks_once_per_interval() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();
        let game = two_player_game(now);
        repo.insert_game(GameRecord::from(game.clone())).await;
        let scheduler = scheduler(&repo, false);

        let first = scheduler.poll_once(now).await.unwrap();
        assert_eq!((first.due, first.ticked), (1, 1));
        let early = scheduler
            .poll_once(now + TimeDelta::milliseconds(500))
            .await
            .unwrap();
        assert_eq!(early.due, 0);
        let later = scheduler.poll_once(now + TimeDelta::seconds(1)).await.unwrap();
        assert_eq!(later.ticked, 1);
        assert_eq!(year_of(&repo, &game).await, -4998);
    }

    #[tokio::test]
    async fn malformed_record_does_not_block_others() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();
        let good = two_player_game(now);
        repo.insert_game(GameRecord::from(good.clone())).await;
        let mut bad = GameRecord::from(two_player_game(now));
        bad.current_players = 9;
        repo.insert_game(bad).await;

        let report = scheduler(&repo, false).poll_once(now).await.unwrap();
        assert_eq!(report.started, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.ticked, 1);
        assert_eq!(year_of(&repo, &good).await, -4999);
    }

    #[tokio::test]
    async fn undecodable_rows_count_as_skipped() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();
        let good = two_player_game(now);
        repo.insert_game(GameRecord::from(good.clone())).await;
        repo.insert_undecodable_game().await;

        let report = scheduler(&repo, false).poll_once(now).await.unwrap();
        assert_eq!(report.started, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.ticked, 1);
    }

    #[tokio::test]
    async fn locks_of_finished_games_are_pruned() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();
        let game = two_player_game(now);
        repo.insert_game(GameRecord::from(game.clone())).await;
        let scheduler = scheduler(&repo, false);

        scheduler.poll_once(now).await.unwrap();
        assert_eq!(scheduler.locks().len(), 1);

        let mut waiting = repo.game(game.id()).await.unwrap();
        waiting.state = aeon_types::GameState::Waiting;
        repo.insert_game(waiting).await;
        scheduler.poll_once(now).await.unwrap();
        assert!(scheduler.locks().is_empty());
    }

    #[tokio::test]
    async fn failing_game_is_isolated() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();
        let healthy = two_player_game(now);
        let broken = two_player_game(now);
        repo.insert_game(GameRecord::from(healthy.clone())).await;
        repo.insert_game(GameRecord::from(broken.clone())).await;
        let mut settlement = establish_settlement(
            broken.id(),
            broken.creator_id(),
            "Broken",
            Location::new(0, 0),
            100,
            32,
            32,
            &SettlementDefaults::default(),
            now,
        )
        .unwrap();
        settlement.food = -1.0;
        repo.insert_settlement(settlement).await;

        let report = scheduler(&repo, false).poll_once(now).await.unwrap();
        assert_eq!((report.ticked, report.failed), (1, 1));
        assert_eq!(year_of(&repo, &healthy).await, -4999);
        assert_eq!(year_of(&repo, &broken).await, -5000);
    }

    #[tokio::test]
    async fn game_in_flight_is_skipped() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();
        let game = two_player_game(now);
        repo.insert_game(GameRecord::from(game.clone())).await;
        let scheduler = scheduler(&repo, false);

        let held = scheduler.locks().try_acquire(game.id());
        assert!(held.is_some());
        let report = scheduler.poll_once(now).await.unwrap();
        assert_eq!((report.due, report.busy, report.ticked), (1, 1, 0));
        drop(held);
        let report = scheduler.poll_once(now).await.unwrap();
        assert_eq!(report.ticked, 1);
    }

    #[tokio::test]
    async fn force_tick_requires_test_mode() {
        let repo = Arc::new(InMemoryRepository::new());
        let scheduler = scheduler(&repo, false);
        assert!(!scheduler.test_mode());
        assert!(matches!(
            scheduler.force_tick().await,
            Err(ControlError::TestModeDisabled)
        ));
    }

    #[tokio::test]
    async fn force_tick_ignores_the_interval() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();
        let game = two_player_game(now);
        repo.insert_game(GameRecord::from(game.clone())).await;
        let scheduler = scheduler(&repo, true);

        for _ in 0..3 {
            let report = scheduler.force_tick().await.unwrap();
            assert_eq!(report.ticked, 1);
        }
        assert_eq!(year_of(&repo, &game).await, -4997);
    }

    #[tokio::test]
    async fn run_ticks_until_shutdown() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();
        let game = two_player_game(now);
        repo.insert_game(GameRecord::from(game.clone())).await;
        let engine = EngineConfig {
            poll_interval_ms: 10,
            ..EngineConfig::default()
        };
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&repo) as Arc<dyn GameRepository>,
            test_context(),
            &engine,
            false,
        ));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(&scheduler).run(rx));

        let ticked = tokio::time::timeout(Duration::from_secs(10), async {
            while repo.tick_saves() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(ticked.is_ok());

        tx.send(true).unwrap();
        let stopped = tokio::time::timeout(Duration::from_secs(10), handle).await;
        assert!(stopped.is_ok());
        assert!(year_of(&repo, &game).await >= -4999);
    }
}
