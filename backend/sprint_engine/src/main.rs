//! Sprint engine service entry point.
//!
//! Applies migrations, then runs the progress worker and the word war
//! sweeper until Ctrl-C. Commands are driven through the library by an
//! outer adapter sharing the same database.

use sprint_engine::{bus, db, sweeper, Config, Engine};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url, config.max_connections).await?;

    let shutdown = CancellationToken::new();
    let (engine, rx) = Engine::new(pool.clone(), config.clone());

    // ─── Background tasks ─────────────────────────────────
    let worker = tokio::spawn(bus::run_worker(pool.clone(), rx, shutdown.clone()));
    let sweeper = tokio::spawn(sweeper::run(
        pool.clone(),
        config.sweep_interval_secs,
        shutdown.clone(),
    ));

    info!("Sprint engine running against {}", config.database_url);
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    // The worker keeps draining queued signals after the publisher is gone.
    drop(engine);
    shutdown.cancel();
    let (worker, sweeper) = tokio::join!(worker, sweeper);
    if let Err(e) = worker {
        error!("Progress worker failed: {e}");
    }
    if let Err(e) = sweeper {
        error!("Word war sweeper failed: {e}");
    }
    pool.close().await;

    Ok(())
}
