//! Restaurant store: validation and CRUD on top of a repository.
//!
//! Checks that need no storage come from `nosh_core`; this layer adds the
//! ones that do (name uniqueness, the reviewed restaurant existing) and
//! turns repository outcomes into `StoreError`s the handlers can act on.

use std::sync::Arc;

use nosh_core::{
    average_rating, validate_name, validate_rating, Field, Restaurant, RestaurantId, Review,
    ValidationErrors,
};
use serde::Serialize;
use tracing::info;

use crate::repository::{
    InMemoryRepository, NewReview, RepositoryError, RestaurantRepository,
};

/// Message recorded when a name belongs to another restaurant.
pub const NAME_TAKEN: &str = "has already been taken";

/// Message recorded when a review names a restaurant that doesn't exist.
pub const RESTAURANT_MUST_EXIST: &str = "must exist";

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("restaurant {0} not found")]
    NotFound(RestaurantId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A restaurant with its reviews, as shown on the list and detail pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantListing {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub reviews: Vec<Review>,
    pub average_rating: Option<f64>,
}

impl RestaurantListing {
    pub fn new(restaurant: Restaurant, reviews: Vec<Review>) -> Self {
        let average_rating = average_rating(&reviews);
        Self {
            restaurant,
            reviews,
            average_rating,
        }
    }
}

/// Validating front for a `RestaurantRepository`.
pub struct RestaurantStore {
    repo: Arc<dyn RestaurantRepository>,
}

impl RestaurantStore {
    pub fn with_repository(repo: Arc<dyn RestaurantRepository>) -> Self {
        Self { repo }
    }

    /// A store backed by an empty in-memory repository.
    pub fn in_memory() -> Self {
        Self::with_repository(Arc::new(InMemoryRepository::new()))
    }

    /// Run every check `create` would, without storing anything.
    pub async fn validate_new(&self, name: &str) -> Result<ValidationErrors, StoreError> {
        Ok(self.validate_name_for(name, None).await?)
    }

    /// Name checks, ignoring `except`'s own current name for uniqueness.
    async fn validate_name_for(
        &self,
        name: &str,
        except: Option<RestaurantId>,
    ) -> Result<ValidationErrors, RepositoryError> {
        let mut errors = validate_name(name);
        if let Some(existing) = self.repo.find_restaurant_by_name(name).await? {
            if Some(existing.id) != except {
                errors.add(Field::Name, NAME_TAKEN);
            }
        }
        Ok(errors)
    }

    pub async fn create(&self, name: &str) -> Result<Restaurant, StoreError> {
        self.validate_name_for(name, None).await?.into_result()?;

        let restaurant = self
            .repo
            .insert_restaurant(name)
            .await
            .map_err(name_conflict_to_validation)?;
        info!("Created restaurant {} ({:?})", restaurant.id, restaurant.name);
        Ok(restaurant)
    }

    pub async fn list(&self) -> Result<Vec<Restaurant>, StoreError> {
        Ok(self.repo.list_restaurants().await?)
    }

    /// Every restaurant with its reviews, in insertion order.
    pub async fn list_with_reviews(&self) -> Result<Vec<RestaurantListing>, StoreError> {
        let restaurants = self.repo.list_restaurants().await?;
        let mut reviews = self.repo.list_reviews().await?;

        Ok(restaurants
            .into_iter()
            .map(|restaurant| {
                let (own, rest): (Vec<Review>, Vec<Review>) = reviews
                    .drain(..)
                    .partition(|r| r.restaurant_id == restaurant.id);
                reviews = rest;
                RestaurantListing::new(restaurant, own)
            })
            .collect())
    }

    pub async fn find(&self, id: RestaurantId) -> Result<Restaurant, StoreError> {
        self.repo
            .get_restaurant(id)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    pub async fn find_with_reviews(&self, id: RestaurantId) -> Result<RestaurantListing, StoreError> {
        let restaurant = self.find(id).await?;
        let reviews = self.repo.reviews_for(id).await?;
        Ok(RestaurantListing::new(restaurant, reviews))
    }

    pub async fn update(&self, id: RestaurantId, name: &str) -> Result<Restaurant, StoreError> {
        // Unknown IDs are NotFound even when the new name is also invalid.
        self.find(id).await?;
        self.validate_name_for(name, Some(id)).await?.into_result()?;

        let restaurant = self
            .repo
            .rename_restaurant(id, name)
            .await
            .map_err(name_conflict_to_validation)?
            .ok_or(StoreError::NotFound(id))?;
        info!("Renamed restaurant {} to {:?}", id, restaurant.name);
        Ok(restaurant)
    }

    /// Delete a restaurant and, with it, all of its reviews.
    pub async fn delete(&self, id: RestaurantId) -> Result<(), StoreError> {
        if !self.repo.delete_restaurant(id).await? {
            return Err(StoreError::NotFound(id));
        }
        info!("Deleted restaurant {}", id);
        Ok(())
    }

    /// Validate and store a review. `rating` is the raw submitted value.
    pub async fn create_review(
        &self,
        restaurant_id: RestaurantId,
        thoughts: &str,
        rating: &str,
    ) -> Result<Review, StoreError> {
        let mut errors = ValidationErrors::new();
        if self.repo.get_restaurant(restaurant_id).await?.is_none() {
            errors.add(Field::Restaurant, RESTAURANT_MUST_EXIST);
        }
        let rating = validate_rating(rating);
        if let Err(rating_errors) = &rating {
            errors.merge(rating_errors.clone());
        }
        errors.into_result()?;
        let rating = rating?;

        let review = self
            .repo
            .insert_review(NewReview {
                restaurant_id,
                thoughts: thoughts.to_string(),
                rating,
            })
            .await?
            // Deleted between the check and the insert.
            .ok_or_else(|| {
                StoreError::from(ValidationErrors::single(
                    Field::Restaurant,
                    RESTAURANT_MUST_EXIST,
                ))
            })?;
        info!(
            "Stored review {} ({} stars) for restaurant {}",
            review.id, review.rating, restaurant_id
        );
        Ok(review)
    }

    pub async fn reviews_for(&self, id: RestaurantId) -> Result<Vec<Review>, StoreError> {
        self.find(id).await?;
        Ok(self.repo.reviews_for(id).await?)
    }
}

/// A storage-level unique violation reads to the user like the store's own check.
fn name_conflict_to_validation(e: RepositoryError) -> StoreError {
    match e {
        RepositoryError::DuplicateName { .. } => {
            StoreError::Validation(ValidationErrors::single(Field::Name, NAME_TAKEN))
        }
        other => StoreError::Repository(other),
    }
}
