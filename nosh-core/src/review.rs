//! Reviews and the rating scale.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::restaurant::RestaurantId;
use crate::validation::{Field, ValidationErrors};

/// Newtype for a review's database ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub i64);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ReviewId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A star rating. Only values in `Rating::MIN..=Rating::MAX` can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

/// Why a raw value is not a rating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("rating is not a number: {0:?}")]
    NotANumber(String),
    #[error("rating {0} is outside 1..=5")]
    OutOfRange(i64),
}

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }

    /// Every selectable rating, lowest first.
    pub fn all() -> impl Iterator<Item = Rating> {
        (Self::MIN..=Self::MAX).map(Rating)
    }

    /// Parse a submitted form value such as `"5"`.
    pub fn parse(raw: &str) -> Result<Self, RatingError> {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| RatingError::NotANumber(raw.to_string()))?;
        Self::try_from(value)
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RatingError::OutOfRange(value))
        }
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted review, owned by one restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub restaurant_id: RestaurantId,
    pub thoughts: String,
    pub rating: Rating,
}

/// Validate a submitted rating, reporting failures against the rating field.
pub fn validate_rating(raw: &str) -> Result<Rating, ValidationErrors> {
    Rating::parse(raw).map_err(|e| {
        let message = match e {
            RatingError::NotANumber(_) => "is not a number",
            RatingError::OutOfRange(_) => "must be between 1 and 5",
        };
        ValidationErrors::single(Field::Rating, message)
    })
}

/// Mean rating of `reviews`, or `None` when there are none.
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating.value())).sum();
    Some(f64::from(total) / reviews.len() as f64)
}
