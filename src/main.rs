//! Rollcall event registration service
//!
//! Main application entry point

use std::sync::Arc;

use tracing::info;

use rollcall::{
    config::Settings,
    database::connection::{create_pool, run_migrations, DatabaseConfig},
    handlers::{router, AppState},
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard must outlive the server
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting rollcall...");

    // Initialize database connection
    info!("Connecting to database...");
    let db_config = DatabaseConfig {
        url: settings.database.url.clone(),
        max_connections: settings.database.max_connections,
        min_connections: settings.database.min_connections,
        ..DatabaseConfig::default()
    };
    let db_pool = create_pool(&db_config).await?;

    // Run database migrations
    run_migrations(&db_pool).await?;

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(db_pool, settings.clone())?;
    let state = AppState {
        services: Arc::new(services),
    };

    let app = router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "rollcall is ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("rollcall has been shut down.");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        info!("Failed to install Ctrl+C handler, shutting down immediately");
    }
}
