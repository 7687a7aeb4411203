//! Engine binary for the Aeon world simulation.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `aeon-config.yaml` plus environment
//! 3. Connect to `PostgreSQL` (fatal on failure) and run migrations
//! 4. Build the tick context and scheduler
//! 5. In test mode, start the control server
//! 6. Run the scheduler until `Ctrl-C`
//! 7. Stop polling, let in-flight ticks finish, close the pool

mod error;

use std::path::Path;
use std::sync::Arc;

use aeon_control::server::{ServerConfig, ServerError, start_server};
use aeon_control::state::AppState;
use aeon_core::{AeonConfig, GameRepository, Scheduler, TickContext, TickTrigger};
use aeon_db::{PgGameRepository, PostgresConfig, PostgresPool};
use aeon_world::EntropySeeds;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "aeon-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, the database or the control
/// server fails to start.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("aeon-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        poll_interval_ms = config.engine.poll_interval_ms,
        tick_interval_ms = config.engine.tick_interval_ms,
        days_per_tick = config.engine.days_per_tick,
        map_width = config.map.width,
        map_height = config.map.height,
        test_mode = config.test_mode,
        "Configuration loaded"
    );

    // 3. Connect to the database. The engine cannot run without it.
    let pool = PostgresPool::connect(&PostgresConfig::from_infrastructure(
        &config.infrastructure,
    ))
    .await?;
    pool.run_migrations().await?;
    let repo: Arc<dyn GameRepository> = Arc::new(PgGameRepository::new(pool.pool().clone()));

    // 4. Build the scheduler.
    let ctx = TickContext::from_config(&config, Arc::new(EntropySeeds));
    let scheduler = Arc::new(Scheduler::new(
        repo,
        ctx,
        &config.engine,
        config.test_mode,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 5. Control server, test mode only.
    let control = if config.test_mode {
        warn!("Test mode enabled: forced ticks are exposed");
        let server_config = ServerConfig::from_infrastructure(&config.infrastructure);
        let trigger: Arc<dyn TickTrigger> = Arc::clone(&scheduler) as Arc<dyn TickTrigger>;
        let state = Arc::new(AppState::new(trigger));
        let rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            start_server(&server_config, state, rx).await
        }))
    } else {
        None
    };

    // 6. Run until Ctrl-C, or until the control server dies.
    let runner = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx));
    let stopped = wait_for_shutdown(tokio::signal::ctrl_c(), control, &shutdown_tx).await;

    // 7. Drain and close.
    runner.await?;
    pool.close().await;
    stopped.control??;
    stopped.signal?;
    info!("aeon-engine stopped");
    Ok(())
}

/// Join handle of the control server task.
type ControlHandle = JoinHandle<Result<(), ServerError>>;

/// How the engine came to stop.
struct Stopped {
    /// Outcome of waiting for the shutdown signal.
    signal: std::io::Result<()>,
    /// Outcome of the control server task, `Ok(Ok(()))` when none ran.
    control: Result<Result<(), ServerError>, JoinError>,
}

/// Wait for `signal` or for the control server to exit, then broadcast
/// shutdown. A failed signal listener is logged and treated as a request
/// to stop.
async fn wait_for_shutdown<S>(
    signal: S,
    control: Option<ControlHandle>,
    shutdown_tx: &watch::Sender<bool>,
) -> Stopped
where
    S: Future<Output = std::io::Result<()>>,
{
    let stopped = match control {
        Some(mut handle) => tokio::select! {
            result = signal => {
                log_signal(&result);
                // Receivers may already be gone if a task exited early.
                let _ = shutdown_tx.send(true);
                Stopped { signal: result, control: handle.await }
            }
            joined = &mut handle => {
                warn!("Control server exited; shutting down");
                Stopped { signal: Ok(()), control: joined }
            }
        },
        None => {
            let result = signal.await;
            log_signal(&result);
            Stopped {
                signal: result,
                control: Ok(Ok(())),
            }
        }
    };
    let _ = shutdown_tx.send(true);
    stopped
}

fn log_signal(result: &std::io::Result<()>) {
    match result {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!(error = %err, "Signal listener failed; shutting down"),
    }
}

/// Load `aeon-config.yaml`, falling back to defaults when it is absent.
///
/// Environment overrides apply either way.
fn load_config() -> Result<AeonConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(AeonConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(AeonConfig::parse("")?)
    }
}
