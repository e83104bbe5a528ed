//! HTTP handlers and routing.
//!
//! Pages are HTML. The list and detail pages also answer JSON when the
//! client asks for it and not for HTML.

pub mod restaurants;
pub mod reviews;

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use nosh_core::RestaurantId;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::flash::Notice;
use crate::store::StoreError;
use crate::views;
use crate::AppState;

/// Where every successful form submission lands.
pub const RESTAURANTS_PATH: &str = "/restaurants";

/// Errors a handler cannot recover from by re-rendering its form.
#[derive(Debug)]
pub enum HandlerError {
    /// No restaurant has this ID. Holds the `:id` segment as requested.
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for HandlerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(id) => {
                warn!("Restaurant {} not found", id);
                (StatusCode::NOT_FOUND, Html(views::not_found(&id))).into_response()
            }
            Self::Internal(message) => {
                error!("Request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(views::server_error())).into_response()
            }
        }
    }
}

/// Parse the `:id` path segment.
///
/// A segment that isn't an ID can't name a restaurant, so it is a 404 like
/// any other missing restaurant rather than a bad request.
pub fn parse_id(raw: &str) -> Result<RestaurantId, HandlerError> {
    raw.parse::<i64>()
        .map(RestaurantId)
        .map_err(|_| HandlerError::NotFound(raw.to_string()))
}

/// 404 body for JSON clients.
pub fn json_not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("restaurant {} not found", id) })),
    )
        .into_response()
}

/// Whether the client wants JSON rather than a page.
///
/// Browsers send `text/html` among their accepted types, so only clients that
/// ask for JSON and not HTML get JSON. A missing header means HTML.
pub fn wants_json(headers: &HeaderMap) -> bool {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/html")
        .to_lowercase();

    accept.contains("application/json") && !accept.contains("text/html")
}

/// 303 to the list page, carrying `notice` for it to show.
pub fn redirect_with_notice(notice: Notice) -> Response {
    (
        [(header::SET_COOKIE, notice.set_cookie())],
        Redirect::to(RESTAURANTS_PATH),
    )
        .into_response()
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "nosh",
        "version": crate::version(),
    }))
}

async fn root() -> Redirect {
    Redirect::to(RESTAURANTS_PATH)
}

async fn fallback() -> Response {
    (StatusCode::NOT_FOUND, Html(views::page_not_found())).into_response()
}

/// Restaurant and review routes.
pub fn restaurants_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/restaurants",
            get(restaurants::index).post(restaurants::create),
        )
        .route("/restaurants/new", get(restaurants::new))
        .route(
            "/restaurants/:id",
            get(restaurants::show)
                .post(restaurants::method_override)
                .patch(restaurants::update)
                .put(restaurants::update)
                .delete(restaurants::destroy),
        )
        .route("/restaurants/:id/edit", get(restaurants::edit))
        .route("/restaurants/:id/reviews", post(reviews::create))
        .route("/restaurants/:id/reviews/new", get(reviews::new))
}

/// The whole application: routes, request tracing and state.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(restaurants_router())
        .fallback(fallback)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_wants_json_for_json_clients() {
        assert!(wants_json(&accept("application/json")));
        assert!(wants_json(&accept("Application/JSON")));
    }

    #[test]
    fn test_browsers_get_html() {
        assert!(!wants_json(&accept(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
        )));
        assert!(!wants_json(&accept("text/html, application/json")));
        assert!(!wants_json(&HeaderMap::new()));
        assert!(!wants_json(&accept("*/*")));
    }

    #[test]
    fn test_redirect_with_notice() {
        let response = redirect_with_notice(Notice::RestaurantDeleted);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/restaurants"
        );
        assert_eq!(
            response.headers().get(header::SET_COOKIE).unwrap(),
            "nosh_flash=restaurant_deleted; Path=/; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_not_found_response() {
        let response = HandlerError::NotFound("3".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), RestaurantId(42));
        for raw in ["abc", "", "4.2", "99999999999999999999"] {
            match parse_id(raw) {
                Err(HandlerError::NotFound(id)) => assert_eq!(id, raw),
                other => panic!("expected NotFound for {:?}, got {:?}", raw, other),
            }
        }
    }
}
