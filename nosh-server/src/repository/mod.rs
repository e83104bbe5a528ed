//! Repository abstraction for restaurant and review persistence.
//!
//! This module defines the `RestaurantRepository` trait that abstracts
//! storage operations. Implementations provide different backends
//! (in-memory, SQLite). Validation lives above this layer in
//! [`crate::store::RestaurantStore`]; repositories only enforce what the
//! storage itself guarantees (unique names, reviews pointing at an existing
//! restaurant, cascading deletes).

mod memory;
pub mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use nosh_core::{Rating, Restaurant, RestaurantId, Review};

/// Errors from repository operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// The backend failed to run an operation.
    #[error("storage error during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    /// Stored data could not be decoded.
    #[error("corrupt {what} in storage")]
    Corruption { what: String },

    /// Another restaurant already has this name.
    #[error("restaurant name {name:?} is already taken")]
    DuplicateName { name: String },
}

impl RepositoryError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corruption(what: impl Into<String>) -> Self {
        Self::Corruption { what: what.into() }
    }
}

/// A review that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub restaurant_id: RestaurantId,
    pub thoughts: String,
    pub rating: Rating,
}

/// Repository trait for persisting restaurants and their reviews.
///
/// Listing methods return records in insertion order.
#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    /// All restaurants, oldest first.
    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError>;

    /// Get a restaurant, returning None if not found.
    async fn get_restaurant(&self, id: RestaurantId)
        -> Result<Option<Restaurant>, RepositoryError>;

    /// Exact, case-sensitive name lookup.
    async fn find_restaurant_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Restaurant>, RepositoryError>;

    /// Store a new restaurant and assign its ID.
    ///
    /// Returns `RepositoryError::DuplicateName` if the name is taken.
    async fn insert_restaurant(&self, name: &str) -> Result<Restaurant, RepositoryError>;

    /// Change a restaurant's name. Returns None if the restaurant doesn't exist.
    async fn rename_restaurant(
        &self,
        id: RestaurantId,
        name: &str,
    ) -> Result<Option<Restaurant>, RepositoryError>;

    /// Delete a restaurant together with its reviews.
    ///
    /// Returns whether a restaurant was removed.
    async fn delete_restaurant(&self, id: RestaurantId) -> Result<bool, RepositoryError>;

    /// Store a review. Returns None if its restaurant doesn't exist.
    async fn insert_review(&self, review: NewReview) -> Result<Option<Review>, RepositoryError>;

    /// Reviews of one restaurant, oldest first.
    async fn reviews_for(&self, id: RestaurantId) -> Result<Vec<Review>, RepositoryError>;

    /// Every review, oldest first.
    async fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError>;
}
