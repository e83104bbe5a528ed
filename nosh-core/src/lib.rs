//! Domain model for nosh: restaurants, their reviews, and the validation
//! rules that do not need storage to check.

pub mod restaurant;
pub mod review;
pub mod validation;

pub use restaurant::*;
pub use review::*;
pub use validation::{Field, FieldError, ValidationErrors};
