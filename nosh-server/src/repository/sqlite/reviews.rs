//! Review operations for the SQLite repository.

use nosh_core::{Rating, RestaurantId, Review, ReviewId};
use rusqlite::params;
use tracing::{error, warn};

use super::super::{NewReview, RepositoryError};
use super::{is_constraint, lock, SqliteRepository};

impl SqliteRepository {
    pub(super) async fn insert_review_impl(
        &self,
        review: NewReview,
    ) -> Result<Option<Review>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "insert_review")?;

            let result = conn.query_row(
                "INSERT INTO reviews (restaurant_id, thoughts, rating)
                 VALUES (?1, ?2, ?3) RETURNING id",
                params![
                    review.restaurant_id.0,
                    review.thoughts,
                    i64::from(review.rating)
                ],
                |row| row.get::<_, i64>(0),
            );

            match result {
                Ok(id) => Ok(Some(Review {
                    id: ReviewId(id),
                    restaurant_id: review.restaurant_id,
                    thoughts: review.thoughts,
                    rating: review.rating,
                })),
                // The restaurant is gone (or never existed).
                Err(e) if is_constraint(&e, rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => Ok(None),
                Err(e) => Err(RepositoryError::storage("insert_review", e.to_string())),
            }
        })
        .await
        .map_err(|e| RepositoryError::storage("insert_review", e.to_string()))?
    }

    /// Reviews of one restaurant, or of all restaurants when `restaurant` is None.
    pub(super) async fn reviews_for_impl(
        &self,
        restaurant: Option<RestaurantId>,
    ) -> Result<Vec<Review>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "reviews_for")?;

            let mut stmt = conn
                .prepare(
                    "SELECT id, restaurant_id, thoughts, rating FROM reviews
                     WHERE ?1 IS NULL OR restaurant_id = ?1
                     ORDER BY id",
                )
                .map_err(|e| RepositoryError::storage("reviews_for", e.to_string()))?;

            let rows = stmt
                .query_map(params![restaurant.map(|id| id.0)], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(|e| RepositoryError::storage("reviews_for", e.to_string()))?;

            let mut reviews = Vec::new();
            for row in rows {
                let (id, restaurant_id, thoughts, rating) = row.map_err(|e| {
                    error!("Failed to read review row from SQLite: {}", e);
                    RepositoryError::corruption(format!("review row ({})", e))
                })?;

                // The CHECK constraint should make this unreachable; skip rather
                // than fail the whole page if an old row slipped through.
                let rating = match Rating::try_from(rating) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("Skipping review {} with corrupt rating: {}", id, e);
                        continue;
                    }
                };

                reviews.push(Review {
                    id: ReviewId(id),
                    restaurant_id: RestaurantId(restaurant_id),
                    thoughts,
                    rating,
                });
            }

            Ok(reviews)
        })
        .await
        .map_err(|e| RepositoryError::storage("reviews_for", e.to_string()))?
    }
}
