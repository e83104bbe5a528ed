//! In-memory implementation of `RestaurantRepository`.
//!
//! All data is held in memory and lost on restart.

use async_trait::async_trait;
use nosh_core::{Restaurant, RestaurantId, Review, ReviewId};
use tokio::sync::RwLock;

use super::{NewReview, RepositoryError, RestaurantRepository};

#[derive(Debug, Default)]
struct Tables {
    restaurants: Vec<Restaurant>,
    reviews: Vec<Review>,
    last_restaurant_id: i64,
    last_review_id: i64,
}

/// In-memory repository.
///
/// Both tables sit behind one `RwLock` so a delete and its cascade are seen
/// together. IDs start at 1 and are never reused.
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RestaurantRepository for InMemoryRepository {
    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.restaurants.clone())
    }

    async fn get_restaurant(
        &self,
        id: RestaurantId,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.restaurants.iter().find(|r| r.id == id).cloned())
    }

    async fn find_restaurant_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.restaurants.iter().find(|r| r.name == name).cloned())
    }

    async fn insert_restaurant(&self, name: &str) -> Result<Restaurant, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.restaurants.iter().any(|r| r.name == name) {
            return Err(RepositoryError::DuplicateName {
                name: name.to_string(),
            });
        }

        tables.last_restaurant_id += 1;
        let restaurant = Restaurant {
            id: RestaurantId(tables.last_restaurant_id),
            name: name.to_string(),
        };
        tables.restaurants.push(restaurant.clone());
        Ok(restaurant)
    }

    async fn rename_restaurant(
        &self,
        id: RestaurantId,
        name: &str,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .restaurants
            .iter()
            .any(|r| r.name == name && r.id != id)
        {
            return Err(RepositoryError::DuplicateName {
                name: name.to_string(),
            });
        }

        Ok(tables
            .restaurants
            .iter_mut()
            .find(|r| r.id == id)
            .map(|restaurant| {
                restaurant.name = name.to_string();
                restaurant.clone()
            }))
    }

    async fn delete_restaurant(&self, id: RestaurantId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.restaurants.len();
        tables.restaurants.retain(|r| r.id != id);
        if tables.restaurants.len() == before {
            return Ok(false);
        }
        tables.reviews.retain(|r| r.restaurant_id != id);
        Ok(true)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Option<Review>, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables
            .restaurants
            .iter()
            .any(|r| r.id == review.restaurant_id)
        {
            return Ok(None);
        }

        tables.last_review_id += 1;
        let stored = Review {
            id: ReviewId(tables.last_review_id),
            restaurant_id: review.restaurant_id,
            thoughts: review.thoughts,
            rating: review.rating,
        };
        tables.reviews.push(stored.clone());
        Ok(Some(stored))
    }

    async fn reviews_for(&self, id: RestaurantId) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .iter()
            .filter(|r| r.restaurant_id == id)
            .cloned()
            .collect())
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.clone())
    }
}
