//! HTML rendering.
//!
//! Pages are built from the templates in `templates/`, embedded at compile
//! time. Placeholders are `{key}`; `fill` substitutes them in a single pass,
//! so text inserted for one placeholder is never scanned for another. Every
//! value that came from a user goes through `escape_html` first.

use nosh_core::{Rating, Restaurant, Review, ValidationErrors};

use crate::flash::Notice;
use crate::store::RestaurantListing;

const LAYOUT: &str = include_str!("templates/layout.html");
const INDEX: &str = include_str!("templates/index.html");
const SHOW: &str = include_str!("templates/show.html");
const RESTAURANT_FORM: &str = include_str!("templates/restaurant_form.html");
const REVIEW_FORM: &str = include_str!("templates/review_form.html");
const NOT_FOUND: &str = include_str!("templates/not_found.html");

/// Escape text for use in element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Replace `{key}` placeholders with their values.
///
/// Braces that don't enclose a known key (CSS rules, for instance) are kept.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let replacement = after.find('}').and_then(|end| {
            let key = &after[..end];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, end))
        });

        match replacement {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Wrap a page body in the shared layout. `title` is escaped here.
fn layout(title: &str, notice: Option<Notice>, body: &str) -> String {
    let notice_html = notice
        .map(|n| format!(r#"<p class="notice">{}</p>"#, n.message()))
        .unwrap_or_default();

    fill(
        LAYOUT,
        &[
            ("title", escape_html(title).as_str()),
            ("notice", notice_html.as_str()),
            ("body", body),
            ("version", crate::version()),
        ],
    )
}

/// Rails-style summary: "1 error prohibited this restaurant from being saved:".
fn error_summary(errors: &ValidationErrors, noun: &str) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let count = errors.len();
    let items: String = errors
        .full_messages()
        .iter()
        .map(|m| format!("<li>{}</li>\n", escape_html(m)))
        .collect();

    format!(
        "<div id=\"error_explanation\">\n<h2>{} {} prohibited this {} from being saved:</h2>\n<ul>\n{}</ul>\n</div>",
        count,
        if count == 1 { "error" } else { "errors" },
        noun,
        items
    )
}

fn average_text(average: Option<f64>) -> String {
    match average {
        Some(avg) => format!("Average rating: {:.1}", avg),
        None => "No reviews yet".to_string(),
    }
}

fn reviews_list(reviews: &[Review]) -> String {
    if reviews.is_empty() {
        return String::new();
    }

    let items: String = reviews
        .iter()
        .map(|r| {
            format!(
                "<li><span class=\"thoughts\">{}</span> <span class=\"rating\">{}/{}</span></li>\n",
                escape_html(&r.thoughts),
                r.rating,
                Rating::MAX
            )
        })
        .collect();

    format!("<ul class=\"reviews\">\n{}</ul>", items)
}

fn restaurant_row(listing: &RestaurantListing) -> String {
    let restaurant = &listing.restaurant;
    let name = escape_html(&restaurant.name);
    let path = restaurant.path();

    format!(
        r#"<section class="restaurant">
<h2><a href="{path}">{name}</a></h2>
<p class="average">{average}</p>
{reviews}
<nav class="actions">
<a href="{path}/edit">Edit {name}</a>
<form action="{path}" method="post" class="button-to">
<input type="hidden" name="_method" value="delete">
<button type="submit">Delete {name}</button>
</form>
<a href="{path}/reviews/new">Review {name}</a>
</nav>
</section>
"#,
        path = path,
        name = name,
        average = average_text(listing.average_rating),
        reviews = reviews_list(&listing.reviews),
    )
}

/// GET /restaurants
pub fn restaurants_index(listings: &[RestaurantListing], notice: Option<Notice>) -> String {
    let restaurants = if listings.is_empty() {
        "<p>No restaurants yet</p>".to_string()
    } else {
        listings.iter().map(restaurant_row).collect()
    };

    let body = fill(INDEX, &[("restaurants", restaurants.as_str())]);
    layout("Restaurants", notice, &body)
}

/// GET /restaurants/:id
pub fn restaurant_show(listing: &RestaurantListing) -> String {
    let restaurant = &listing.restaurant;
    let path = restaurant.path();

    let body = fill(
        SHOW,
        &[
            ("name", escape_html(&restaurant.name).as_str()),
            ("average", average_text(listing.average_rating).as_str()),
            ("reviews", reviews_list(&listing.reviews).as_str()),
            ("review_path", format!("{}/reviews/new", path).as_str()),
            ("edit_path", format!("{}/edit", path).as_str()),
        ],
    );
    layout(&restaurant.name, None, &body)
}

/// GET /restaurants/new, and POST /restaurants when validation fails.
pub fn new_restaurant(name: &str, errors: &ValidationErrors) -> String {
    let body = fill(
        RESTAURANT_FORM,
        &[
            ("heading", "New restaurant"),
            ("errors", error_summary(errors, "restaurant").as_str()),
            ("action", "/restaurants"),
            ("method_field", ""),
            ("name", escape_html(name).as_str()),
            ("submit", "Create Restaurant"),
        ],
    );
    layout("New restaurant", None, &body)
}

/// GET /restaurants/:id/edit, and the update when validation fails.
///
/// `name` is the value to show in the field, which after a failed update is
/// the rejected submission rather than the stored name.
pub fn edit_restaurant(restaurant: &Restaurant, name: &str, errors: &ValidationErrors) -> String {
    let heading = format!("Editing {}", escape_html(&restaurant.name));
    let body = fill(
        RESTAURANT_FORM,
        &[
            ("heading", heading.as_str()),
            ("errors", error_summary(errors, "restaurant").as_str()),
            ("action", restaurant.path().as_str()),
            (
                "method_field",
                r#"<input type="hidden" name="_method" value="patch">"#,
            ),
            ("name", escape_html(name).as_str()),
            ("submit", "Update Restaurant"),
        ],
    );
    layout(&format!("Editing {}", restaurant.name), None, &body)
}

/// GET /restaurants/:id/reviews/new, and POST when validation fails.
///
/// `rating` is the submitted value to keep selected, if any.
pub fn new_review(
    restaurant: &Restaurant,
    thoughts: &str,
    rating: Option<&str>,
    errors: &ValidationErrors,
) -> String {
    let rating_options: String = Rating::all()
        .map(|r| {
            let value = r.to_string();
            let selected = if rating == Some(value.as_str()) {
                " selected"
            } else {
                ""
            };
            format!("<option value=\"{0}\"{1}>{0}</option>\n", value, selected)
        })
        .collect();

    let path = restaurant.path();
    let body = fill(
        REVIEW_FORM,
        &[
            ("restaurant_name", escape_html(&restaurant.name).as_str()),
            ("errors", error_summary(errors, "review").as_str()),
            ("action", format!("{}/reviews", path).as_str()),
            ("thoughts", escape_html(thoughts).as_str()),
            ("rating_options", rating_options.as_str()),
            ("restaurant_path", path.as_str()),
        ],
    );
    layout(&format!("Review {}", restaurant.name), None, &body)
}

/// 404 page for an unknown restaurant ID, as it appeared in the path.
pub fn not_found(id: &str) -> String {
    let message = format!("There is no restaurant with id {}.", escape_html(id));
    let body = fill(NOT_FOUND, &[("message", message.as_str())]);
    layout("Restaurant not found", None, &body)
}

/// 404 page for a path no route matches.
pub fn page_not_found() -> String {
    layout(
        "Page not found",
        None,
        "<h1>Page not found</h1>\n<p><a href=\"/restaurants\">Back to restaurants</a></p>",
    )
}

/// 500 page. Details go to the log, not the browser.
pub fn server_error() -> String {
    layout(
        "Something went wrong",
        None,
        "<h1>Something went wrong</h1>\n<p>Please try again later.</p>",
    )
}
