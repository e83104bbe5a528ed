pub mod config;
pub mod flash;
pub mod handlers;
pub mod repository;
pub mod store;
pub mod views;

pub use config::Config;
pub use handlers::app;
pub use repository::{InMemoryRepository, RepositoryError, RestaurantRepository, SqliteRepository};
pub use store::{RestaurantListing, RestaurantStore, StoreError};

/// Version shown in the page footer and on /health.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub struct AppState {
    pub store: RestaurantStore,
}
