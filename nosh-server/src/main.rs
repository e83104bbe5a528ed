use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nosh_server::{
    AppState, Config, InMemoryRepository, RestaurantRepository, RestaurantStore, SqliteRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting nosh {}", nosh_server::version());

    let config =
        Config::from_env().context("Failed to load configuration from environment variables")?;

    let repo: Arc<dyn RestaurantRepository> = if config.database_in_memory {
        info!("Using in-memory storage; data will not survive a restart");
        Arc::new(InMemoryRepository::new())
    } else {
        let db_path = config.database_path();
        info!("Using database: {}", db_path.display());
        Arc::new(SqliteRepository::new(&db_path).context("Failed to initialize SQLite database")?)
    };

    let app_state = Arc::new(AppState {
        store: RestaurantStore::with_repository(repo),
    });
    let app = nosh_server::app(app_state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
