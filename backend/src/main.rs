//! Backend entry-point: loads configuration, wires the sequence store and
//! serves the REST API.

mod server;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use lms_backend::config::AppConfig;
use lms_backend::inbound::http::health::HealthState;
use lms_backend::outbound::persistence::{DbPool, run_migrations};
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let app_config = AppConfig::load()
        .map_err(|e| std::io::Error::other(format!("failed to load configuration: {e}")))?;
    let mut server_config = ServerConfig::new(app_config.bind_addr(), app_config.lock_timeout());

    if let Some(pool_config) = app_config.pool_config() {
        if app_config.run_migrations {
            run_migrations(pool_config.database_url())
                .await
                .map_err(std::io::Error::other)?;
        }
        let pool = DbPool::new(pool_config)
            .await
            .map_err(std::io::Error::other)?;
        server_config = server_config.with_db_pool(pool);
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), &server_config)?;
    info!(bind_addr = %app_config.bind_addr(), "serving sequencing API");

    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome
}
