//! Restaurant records and their storage-free checks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::{Field, ValidationErrors};

/// Minimum number of characters in a restaurant name.
pub const NAME_MIN_LENGTH: usize = 2;

/// Newtype for a restaurant's database ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestaurantId(pub i64);

impl fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RestaurantId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A persisted restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
}

impl Restaurant {
    /// Path of the restaurant's detail page.
    pub fn path(&self) -> String {
        format!("/restaurants/{}", self.id)
    }
}

/// Check a candidate name against the rules that need no other records.
///
/// Length is counted in characters, not bytes, and the name is not trimmed.
/// Uniqueness is checked by the store, which can see the other names.
pub fn validate_name(name: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if name.chars().count() < NAME_MIN_LENGTH {
        errors.add(
            Field::Name,
            format!("is too short (minimum is {} characters)", NAME_MIN_LENGTH),
        );
    }
    errors
}
