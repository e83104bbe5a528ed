//! Restaurant pages: list, detail, create, edit and delete.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    Form,
};
use nosh_core::{RestaurantId, ValidationErrors};
use serde::Deserialize;
use tracing::warn;

use super::{json_not_found, parse_id, redirect_with_notice, wants_json, HandlerError};
use crate::flash::{self, Notice};
use crate::store::StoreError;
use crate::views;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RestaurantForm {
    #[serde(default)]
    pub name: String,
}

/// A POST standing in for PATCH, PUT or DELETE, as HTML forms can only POST.
#[derive(Debug, Deserialize)]
pub struct OverrideForm {
    #[serde(rename = "_method", default)]
    pub method: String,
    #[serde(default)]
    pub name: String,
}

/// Handler: GET /restaurants
///
/// Shows any pending flash notice and clears the cookie, recognised or not.
pub async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    let listings = state.store.list_with_reviews().await?;

    if wants_json(&headers) {
        return Ok(Json(listings).into_response());
    }

    let notice = flash::take(&headers);
    let html = Html(views::restaurants_index(&listings, notice));
    Ok(if flash::is_pending(&headers) {
        ([(header::SET_COOKIE, flash::clear_cookie())], html).into_response()
    } else {
        html.into_response()
    })
}

/// Handler: GET /restaurants/new
pub async fn new() -> Html<String> {
    Html(views::new_restaurant("", &ValidationErrors::new()))
}

/// Handler: POST /restaurants
pub async fn create(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RestaurantForm>,
) -> Result<Response, HandlerError> {
    match state.store.create(&form.name).await {
        Ok(_) => Ok(redirect_with_notice(Notice::RestaurantCreated)),
        Err(StoreError::Validation(errors)) => {
            warn!("Rejected new restaurant {:?}: {}", form.name, errors);
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(views::new_restaurant(&form.name, &errors)),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Handler: GET /restaurants/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    let json = wants_json(&headers);
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(_) if json => return Ok(json_not_found(&raw_id)),
        Err(e) => return Err(e),
    };

    match state.store.find_with_reviews(id).await {
        Ok(listing) if json => Ok(Json(listing).into_response()),
        Ok(listing) => Ok(Html(views::restaurant_show(&listing)).into_response()),
        Err(StoreError::NotFound(_)) if json => Ok(json_not_found(&raw_id)),
        Err(e) => Err(e.into()),
    }
}

/// Handler: GET /restaurants/:id/edit
pub async fn edit(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Html<String>, HandlerError> {
    let restaurant = state.store.find(parse_id(&raw_id)?).await?;
    Ok(Html(views::edit_restaurant(
        &restaurant,
        &restaurant.name,
        &ValidationErrors::new(),
    )))
}

/// Handler: PATCH/PUT /restaurants/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Form(form): Form<RestaurantForm>,
) -> Result<Response, HandlerError> {
    update_restaurant(&state, parse_id(&raw_id)?, &form.name).await
}

/// Handler: DELETE /restaurants/:id
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, HandlerError> {
    destroy_restaurant(&state, parse_id(&raw_id)?).await
}

/// Handler: POST /restaurants/:id
///
/// Dispatches on the hidden `_method` field.
pub async fn method_override(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Form(form): Form<OverrideForm>,
) -> Result<Response, HandlerError> {
    let id = parse_id(&raw_id)?;
    match form.method.to_ascii_lowercase().as_str() {
        "patch" | "put" => update_restaurant(&state, id, &form.name).await,
        "delete" => destroy_restaurant(&state, id).await,
        other => {
            warn!(
                "Unsupported _method override {:?} for restaurant {}",
                other, id
            );
            Ok((
                StatusCode::METHOD_NOT_ALLOWED,
                "Unsupported _method override",
            )
                .into_response())
        }
    }
}

async fn update_restaurant(
    state: &AppState,
    id: RestaurantId,
    name: &str,
) -> Result<Response, HandlerError> {
    match state.store.update(id, name).await {
        Ok(_) => Ok(redirect_with_notice(Notice::RestaurantUpdated)),
        Err(StoreError::Validation(errors)) => {
            warn!("Rejected rename of restaurant {} to {:?}: {}", id, name, errors);
            let restaurant = state.store.find(id).await?;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(views::edit_restaurant(&restaurant, name, &errors)),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn destroy_restaurant(state: &AppState, id: RestaurantId) -> Result<Response, HandlerError> {
    state.store.delete(id).await?;
    Ok(redirect_with_notice(Notice::RestaurantDeleted))
}
