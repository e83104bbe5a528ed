//! SQLite implementation of `RestaurantRepository`.
//!
//! This provides persistent storage that survives service restarts.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and add
//! a migration in `run_migrations()`. Migrations run sequentially from the
//! current version to the target version.
//!
//! # Integrity
//!
//! The storage enforces the same rules the store validates: `restaurants.name`
//! is `UNIQUE`, and `reviews.restaurant_id` is a foreign key with
//! `ON DELETE CASCADE`. SQLite only honours foreign keys when the
//! `foreign_keys` pragma is on, which `new()` sets for the connection.

mod reviews;


use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use nosh_core::{Restaurant, RestaurantId, Review};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::error;

use super::{NewReview, RepositoryError, RestaurantRepository};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed repository.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite operations
/// without blocking the async runtime.
pub struct SqliteRepository {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open (or create) the database at `path` and bring its schema up to date.
    ///
    /// The connection is configured with:
    /// - `foreign_keys = ON` so deleting a restaurant deletes its reviews
    /// - `journal_mode = WAL` for crash safety
    /// - `busy_timeout = 5000ms` to wait out other writers
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        // In-memory databases report "memory" and have nothing to make durable.
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;

        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));

        if !journal_mode_ok {
            return Err(RepositoryError::storage(
                "configure journal_mode",
                format!(
                    "Failed to enable WAL mode: SQLite returned '{}' instead of 'wal'",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        // 0 means a fresh database.
        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS restaurants (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                );

                CREATE TABLE IF NOT EXISTS reviews (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    restaurant_id INTEGER NOT NULL
                        REFERENCES restaurants(id) ON DELETE CASCADE,
                    thoughts TEXT NOT NULL,
                    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5)
                );

                CREATE INDEX IF NOT EXISTS idx_reviews_restaurant
                    ON reviews(restaurant_id);
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Create a new in-memory SQLite repository (for testing).
    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Lock the connection, reporting a poisoned mutex as a storage error.
pub(super) fn lock<'a>(
    conn: &'a Mutex<Connection>,
    operation: &'static str,
) -> Result<MutexGuard<'a, Connection>, RepositoryError> {
    conn.lock()
        .map_err(|_| RepositoryError::storage(operation, "connection mutex poisoned"))
}

/// Whether `e` is a failed constraint with the given extended result code.
pub(super) fn is_constraint(e: &rusqlite::Error, extended_code: i32) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.extended_code == extended_code)
}

fn restaurant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Restaurant> {
    Ok(Restaurant {
        id: RestaurantId(row.get(0)?),
        name: row.get(1)?,
    })
}

// =============================================================================
// RestaurantRepository trait implementation
// =============================================================================

#[async_trait]
impl RestaurantRepository for SqliteRepository {
    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "list_restaurants")?;

            let mut stmt = conn
                .prepare("SELECT id, name FROM restaurants ORDER BY id")
                .map_err(|e| RepositoryError::storage("list_restaurants", e.to_string()))?;

            let rows = stmt
                .query_map([], restaurant_from_row)
                .map_err(|e| RepositoryError::storage("list_restaurants", e.to_string()))?;

            // A restaurant that can't be read would silently vanish from the
            // list, so fail the whole listing instead.
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|e| {
                error!("Failed to read restaurant row from SQLite: {}", e);
                RepositoryError::corruption(format!("restaurant row ({})", e))
            })
        })
        .await
        .map_err(|e| RepositoryError::storage("list_restaurants", e.to_string()))?
    }

    async fn get_restaurant(
        &self,
        id: RestaurantId,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "get_restaurant")?;

            conn.query_row(
                "SELECT id, name FROM restaurants WHERE id = ?1",
                params![id.0],
                restaurant_from_row,
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get_restaurant", e.to_string()))
        })
        .await
        .map_err(|e| RepositoryError::storage("get_restaurant", e.to_string()))?
    }

    async fn find_restaurant_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let conn = self.conn.clone();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "find_restaurant_by_name")?;

            conn.query_row(
                "SELECT id, name FROM restaurants WHERE name = ?1",
                params![name],
                restaurant_from_row,
            )
            .optional()
            .map_err(|e| RepositoryError::storage("find_restaurant_by_name", e.to_string()))
        })
        .await
        .map_err(|e| RepositoryError::storage("find_restaurant_by_name", e.to_string()))?
    }

    async fn insert_restaurant(&self, name: &str) -> Result<Restaurant, RepositoryError> {
        let conn = self.conn.clone();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "insert_restaurant")?;

            let id: i64 = conn
                .query_row(
                    "INSERT INTO restaurants (name) VALUES (?1) RETURNING id",
                    params![name],
                    |row| row.get(0),
                )
                .map_err(|e| {
                    if is_constraint(&e, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) {
                        RepositoryError::DuplicateName { name: name.clone() }
                    } else {
                        RepositoryError::storage("insert_restaurant", e.to_string())
                    }
                })?;

            Ok(Restaurant {
                id: RestaurantId(id),
                name,
            })
        })
        .await
        .map_err(|e| RepositoryError::storage("insert_restaurant", e.to_string()))?
    }

    async fn rename_restaurant(
        &self,
        id: RestaurantId,
        name: &str,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let conn = self.conn.clone();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "rename_restaurant")?;

            conn.query_row(
                "UPDATE restaurants SET name = ?2 WHERE id = ?1 RETURNING id, name",
                params![id.0, name],
                restaurant_from_row,
            )
            .optional()
            .map_err(|e| {
                if is_constraint(&e, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) {
                    RepositoryError::DuplicateName { name: name.clone() }
                } else {
                    RepositoryError::storage("rename_restaurant", e.to_string())
                }
            })
        })
        .await
        .map_err(|e| RepositoryError::storage("rename_restaurant", e.to_string()))?
    }

    async fn delete_restaurant(&self, id: RestaurantId) -> Result<bool, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "delete_restaurant")?;

            // Reviews go with it through ON DELETE CASCADE.
            let deleted = conn
                .execute("DELETE FROM restaurants WHERE id = ?1", params![id.0])
                .map_err(|e| RepositoryError::storage("delete_restaurant", e.to_string()))?;

            Ok(deleted > 0)
        })
        .await
        .map_err(|e| RepositoryError::storage("delete_restaurant", e.to_string()))?
    }

    async fn insert_review(&self, review: NewReview) -> Result<Option<Review>, RepositoryError> {
        self.insert_review_impl(review).await
    }

    async fn reviews_for(&self, id: RestaurantId) -> Result<Vec<Review>, RepositoryError> {
        self.reviews_for_impl(Some(id)).await
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        self.reviews_for_impl(None).await
    }
}
