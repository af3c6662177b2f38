//! Server binary for the Simtrack scheduling service.
//!
//! Wires together configuration, the `PostgreSQL` pool, schema
//! migrations, machine-fleet seeding, and the API server.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `simtrack-config.yaml` (env overrides win)
//! 3. Connect the `PostgreSQL` pool
//! 4. Run pending schema migrations
//! 5. Seed the default machine fleet (idempotent, optional)
//! 6. Serve the HTTP + `WebSocket` API until terminated

mod config;
mod error;
mod seed;

use std::path::Path;
use std::sync::Arc;

use simtrack_api::{AppState, ServerConfig};
use simtrack_db::{PostgresConfig, PostgresPool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerSettings;
use crate::error::ServerError;

/// Application entry point for the Simtrack server.
///
/// # Errors
///
/// Returns an error if any startup step or the server itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("simtrack-server starting");

    // 2. Load configuration.
    let settings = load_settings()?;
    info!(
        host = settings.server.host,
        port = settings.server.port,
        max_connections = settings.database.max_connections,
        seed_machines = settings.seed.machines_enabled,
        "Configuration loaded"
    );

    // 3. Connect to PostgreSQL.
    let pg_config = PostgresConfig::new(&settings.database.url)
        .with_max_connections(settings.database.max_connections);
    let pool = PostgresPool::connect(&pg_config)
        .await
        .map_err(ServerError::from)?;

    // 4. Run migrations.
    pool.run_migrations().await.map_err(ServerError::from)?;

    // 5. Seed the default machine fleet.
    if settings.seed.machines_enabled {
        let created = seed::seed_machines(&pool).await.map_err(ServerError::from)?;
        info!(created, "Machine fleet seeded");
    }

    // 6. Serve the API.
    let state = Arc::new(AppState::new(pool));
    let server_config = ServerConfig {
        host: settings.server.host.clone(),
        port: settings.server.port,
    };
    simtrack_api::start_server(&server_config, state)
        .await
        .map_err(ServerError::from)?;

    Ok(())
}

/// Load `simtrack-config.yaml` from the working directory, falling back
/// to defaults (plus env overrides) when the file is absent.
fn load_settings() -> Result<ServerSettings, ServerError> {
    let path = Path::new("simtrack-config.yaml");
    if path.exists() {
        Ok(ServerSettings::from_file(path)?)
    } else {
        info!("No simtrack-config.yaml found, using defaults");
        Ok(ServerSettings::parse("")?)
    }
}
