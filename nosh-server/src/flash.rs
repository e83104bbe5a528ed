//! One-shot notices carried across a redirect.
//!
//! A successful form submission redirects to the list page. The notice to
//! show there travels in the `nosh_flash` cookie as a short code; the list
//! page renders it once and clears the cookie.

use axum::http::{header, HeaderMap};

pub const FLASH_COOKIE: &str = "nosh_flash";

/// Confirmation shown after a successful action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    RestaurantCreated,
    RestaurantUpdated,
    RestaurantDeleted,
    ReviewCreated,
}

impl Notice {
    pub fn code(self) -> &'static str {
        match self {
            Self::RestaurantCreated => "restaurant_created",
            Self::RestaurantUpdated => "restaurant_updated",
            Self::RestaurantDeleted => "restaurant_deleted",
            Self::ReviewCreated => "review_created",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "restaurant_created" => Some(Self::RestaurantCreated),
            "restaurant_updated" => Some(Self::RestaurantUpdated),
            "restaurant_deleted" => Some(Self::RestaurantDeleted),
            "review_created" => Some(Self::ReviewCreated),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::RestaurantCreated => "Restaurant created successfully",
            Self::RestaurantUpdated => "Restaurant updated successfully",
            Self::RestaurantDeleted => "Restaurant deleted successfully",
            Self::ReviewCreated => "Review added successfully",
        }
    }

    /// `Set-Cookie` value that carries this notice to the next page.
    pub fn set_cookie(self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            FLASH_COOKIE,
            self.code()
        )
    }
}

/// `Set-Cookie` value that removes a shown notice.
pub fn clear_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        FLASH_COOKIE
    )
}

fn flash_value(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .map(|(_, value)| value)
}

/// The notice waiting in the request's cookies, if any.
///
/// Unknown codes are ignored, so a stale or tampered cookie shows nothing.
pub fn take(headers: &HeaderMap) -> Option<Notice> {
    flash_value(headers).and_then(Notice::from_code)
}

/// Whether the request carries a flash cookie at all, shown or not.
pub fn is_pending(headers: &HeaderMap) -> bool {
    flash_value(headers).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const ALL: [Notice; 4] = [
        Notice::RestaurantCreated,
        Notice::RestaurantUpdated,
        Notice::RestaurantDeleted,
        Notice::ReviewCreated,
    ];

    #[test]
    fn test_codes_are_recognised() {
        for notice in ALL {
            assert_eq!(Notice::from_code(notice.code()), Some(notice));
        }
        assert_eq!(Notice::from_code("nonsense"), None);
    }

    #[test]
    fn test_deleted_message() {
        assert_eq!(
            Notice::RestaurantDeleted.message(),
            "Restaurant deleted successfully"
        );
    }

    #[test]
    fn test_take_finds_flash_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; nosh_flash=restaurant_deleted; lang=en"),
        );
        assert_eq!(take(&headers), Some(Notice::RestaurantDeleted));
    }

    #[test]
    fn test_take_without_cookie() {
        assert_eq!(take(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("nosh_flash="));
        assert_eq!(take(&headers), None);
    }

    #[test]
    fn test_unknown_code_is_pending_but_not_shown() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("nosh_flash=bogus"));
        assert_eq!(take(&headers), None);
        assert!(is_pending(&headers));

        assert!(!is_pending(&HeaderMap::new()));
    }

    #[test]
    fn test_cookie_strings() {
        assert_eq!(
            Notice::ReviewCreated.set_cookie(),
            "nosh_flash=review_created; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(clear_cookie().contains("Max-Age=0"));
    }
}
