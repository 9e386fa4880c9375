use std::net::SocketAddr;
use std::sync::Arc;

use aerotrack_api::{app, worker, AppState};
use aerotrack_core::{EntityStore, SimClock};
use aerotrack_ops::{FlightOps, OpsRules};
use aerotrack_store::{Config, DbClient, MemoryStore, PgStore};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aerotrack_api=debug,aerotrack_ops=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting AeroTrack API on port {}", config.server.port);

    // Storage
    let sim = &config.simulation;
    let store: Arc<dyn EntityStore> = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections, sim.store_timeout())
                .await
                .context("Failed to connect to Postgres")?;
            if config.database.run_migrations {
                db.migrate().await.context("Failed to run migrations")?;
            }
            tracing::info!("Using Postgres store");
            Arc::new(PgStore::new(db.pool))
        }
        None => {
            tracing::warn!("No database.url configured, state lives in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let rules = OpsRules {
        turnaround: sim.turnaround(),
        cockpit_capacity: sim.cockpit_capacity,
        store_timeout: sim.store_timeout(),
    };
    let clock = SimClock::new(sim.start_time()?, sim.tick());
    tracing::info!("Simulation starts at {} with {} minute ticks", clock.now(), sim.tick_minutes);

    let app_state = AppState::new(FlightOps::new(store, rules), clock);

    if let Some(seconds) = sim.auto_cycle_seconds.filter(|s| *s > 0) {
        tokio::spawn(worker::start_cycle_worker(
            app_state.clone(),
            std::time::Duration::from_secs(seconds),
        ));
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
