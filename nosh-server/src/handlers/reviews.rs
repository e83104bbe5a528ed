//! Review form and submission.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use nosh_core::ValidationErrors;
use serde::Deserialize;
use tracing::warn;

use super::{parse_id, redirect_with_notice, HandlerError};
use crate::flash::Notice;
use crate::store::StoreError;
use crate::views;
use crate::AppState;

/// Submitted review. `rating` stays a string so a bad value is a form error
/// rather than a rejected request.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub thoughts: String,
    #[serde(default)]
    pub rating: String,
}

/// Handler: GET /restaurants/:id/reviews/new
pub async fn new(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Html<String>, HandlerError> {
    let restaurant = state.store.find(parse_id(&raw_id)?).await?;
    Ok(Html(views::new_review(
        &restaurant,
        "",
        None,
        &ValidationErrors::new(),
    )))
}

/// Handler: POST /restaurants/:id/reviews
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, HandlerError> {
    let id = parse_id(&raw_id)?;

    match state
        .store
        .create_review(id, &form.thoughts, &form.rating)
        .await
    {
        Ok(_) => Ok(redirect_with_notice(Notice::ReviewCreated)),
        Err(StoreError::Validation(errors)) => {
            warn!("Rejected review for restaurant {}: {}", id, errors);
            // No restaurant means no form to show again: this is a 404.
            let restaurant = state.store.find(id).await?;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(views::new_review(
                    &restaurant,
                    &form.thoughts,
                    Some(form.rating.as_str()),
                    &errors,
                )),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}
