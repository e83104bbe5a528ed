//! Browser-like driver for acceptance tests.
//!
//! `Session` sends requests straight to the router, follows redirects, keeps
//! cookies, and finds links, fields and buttons by their visible text the way
//! a user would.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use nosh_server::views::escape_html;
use nosh_server::{AppState, RestaurantStore, SqliteRepository};
use tower::ServiceExt;

const MAX_REDIRECTS: usize = 5;

pub struct TestApp {
    pub state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    pub fn in_memory() -> Self {
        Self::with_store(RestaurantStore::in_memory())
    }

    pub fn sqlite() -> Self {
        let repo = SqliteRepository::new_in_memory().expect("in-memory SQLite should open");
        Self::with_store(RestaurantStore::with_repository(Arc::new(repo)))
    }

    /// One app per storage backend.
    pub fn all() -> Vec<TestApp> {
        vec![Self::in_memory(), Self::sqlite()]
    }

    fn with_store(store: RestaurantStore) -> Self {
        let state = Arc::new(AppState { store });
        let router = nosh_server::app(state.clone());
        Self { state, router }
    }

    pub fn store(&self) -> &RestaurantStore {
        &self.state.store
    }

    pub fn session(&self) -> Session {
        Session::new(self.router.clone())
    }

    /// Send one request without following redirects.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn get_json(&self, path: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .uri(path)
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, serde_json::from_str(&body).unwrap())
    }
}

pub struct Session {
    router: Router,
    cookies: HashMap<String, String>,
    filled: Vec<(String, String)>,
    pub current_path: String,
    pub status: StatusCode,
    pub body: String,
}

impl Session {
    fn new(router: Router) -> Self {
        Self {
            router,
            cookies: HashMap::new(),
            filled: Vec::new(),
            current_path: String::new(),
            status: StatusCode::OK,
            body: String::new(),
        }
    }

    pub async fn visit(&mut self, path: &str) {
        self.request(Method::GET, path, None).await;
    }

    /// Submit form fields to `path` the way a browser would.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) {
        let fields: Vec<(String, String)> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.request(Method::POST, path, Some(encode_form(&fields)))
            .await;
    }

    async fn request(&mut self, method: Method, path: &str, form: Option<String>) {
        let mut method = method;
        let mut path = path.to_string();
        let mut form = form;

        for _ in 0..=MAX_REDIRECTS {
            let mut builder = Request::builder().method(method.clone()).uri(&path);
            if !self.cookies.is_empty() {
                builder = builder.header(header::COOKIE, self.cookie_header());
            }
            let body = match form.take() {
                Some(encoded) => {
                    builder = builder.header(
                        header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    );
                    Body::from(encoded)
                }
                None => Body::empty(),
            };

            let response = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            self.store_cookies(response.headers());

            if response.status().is_redirection() {
                path = response
                    .headers()
                    .get(header::LOCATION)
                    .expect("redirect without Location")
                    .to_str()
                    .unwrap()
                    .to_string();
                method = Method::GET;
                continue;
            }

            self.status = response.status();
            self.current_path = path.split('?').next().unwrap_or_default().to_string();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            self.body = String::from_utf8(bytes.to_vec()).unwrap();
            return;
        }

        panic!("more than {} redirects from {}", MAX_REDIRECTS, path);
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn store_cookies(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            let mut parts = value.split(';');
            let Some((name, cookie_value)) = parts.next().and_then(|p| p.trim().split_once('='))
            else {
                continue;
            };
            let expired = parts.any(|attr| attr.trim().eq_ignore_ascii_case("Max-Age=0"));
            if expired || cookie_value.is_empty() {
                self.cookies.remove(name);
            } else {
                self.cookies
                    .insert(name.to_string(), cookie_value.to_string());
            }
        }
    }

    // =========================================================================
    // Finding things on the page
    // =========================================================================

    /// Visible text of the page body, whitespace collapsed.
    pub fn text(&self) -> String {
        let body = match (self.body.find("<body>"), self.body.find("</body>")) {
            (Some(start), Some(end)) => &self.body[start..end],
            _ => self.body.as_str(),
        };
        normalize(&unescape(&strip_tags(body)))
    }

    pub fn has_content(&self, text: &str) -> bool {
        self.text().contains(&normalize(text))
    }

    /// Whether some `<tag>` element's text contains `text`.
    pub fn has_css(&self, tag: &str, text: &str) -> bool {
        let open = format!("<{}", tag);
        let close = format!("</{}>", tag);
        self.body.match_indices(&open).any(|(start, _)| {
            let Some(content_start) = self.body[start..].find('>') else {
                return false;
            };
            let content_start = start + content_start + 1;
            let Some(len) = self.body[content_start..].find(&close) else {
                return false;
            };
            let inner = &self.body[content_start..content_start + len];
            normalize(&unescape(&strip_tags(inner))).contains(text)
        })
    }

    pub fn link_href(&self, text: &str) -> Option<String> {
        let needle = format!("\">{}</a>", escape_html(text));
        let end = self.body.find(&needle)?;
        let start = self.body[..end].rfind("href=\"")? + "href=\"".len();
        Some(unescape(&self.body[start..end]))
    }

    pub fn has_link(&self, text: &str) -> bool {
        self.link_href(text).is_some()
    }

    pub fn has_button(&self, text: &str) -> bool {
        self.body
            .contains(&format!(">{}</button>", escape_html(text)))
    }

    pub async fn click_link(&mut self, text: &str) {
        let href = self
            .link_href(text)
            .unwrap_or_else(|| panic!("no link {:?} on {}", text, self.current_path));
        self.visit(&href).await;
    }

    /// Name of the form control labelled `label`.
    fn field_name(&self, label: &str) -> String {
        let needle = format!(">{}</label>", escape_html(label));
        let label_end = self
            .body
            .find(&needle)
            .unwrap_or_else(|| panic!("no field labelled {:?}", label));
        let label_start = self.body[..label_end].rfind("<label").unwrap();
        let id = attr(&self.body[label_start..label_end], "for").unwrap();

        let id_pos = self
            .body
            .find(&format!(" id=\"{}\"", id))
            .unwrap_or_else(|| panic!("no control with id {:?}", id));
        let tag_start = self.body[..id_pos].rfind('<').unwrap();
        let tag_end = id_pos + self.body[id_pos..].find('>').unwrap();
        attr(&self.body[tag_start..tag_end], "name").unwrap()
    }

    pub fn fill_in(&mut self, label: &str, value: &str) {
        let name = self.field_name(label);
        self.filled.push((name, value.to_string()));
    }

    pub fn select(&mut self, value: &str, from: &str) {
        self.fill_in(from, value);
    }

    /// Submit the form containing the button, with any filled-in values.
    pub async fn click_button(&mut self, text: &str) {
        let needle = format!(">{}</button>", escape_html(text));
        let button = self
            .body
            .find(&needle)
            .unwrap_or_else(|| panic!("no button {:?} on {}", text, self.current_path));
        let form_start = self.body[..button].rfind("<form").unwrap();
        let form_end = button + self.body[button..].find("</form>").unwrap();
        let form = &self.body[form_start..form_end];

        let form_tag = &form[..form.find('>').unwrap()];
        let action = attr(form_tag, "action").unwrap();

        let mut fields = form_defaults(form);
        for (name, value) in self.filled.drain(..) {
            match fields.iter_mut().find(|(n, _)| *n == name) {
                Some(field) => field.1 = value,
                None => fields.push((name, value)),
            }
        }

        self.request(Method::POST, &action, Some(encode_form(&fields)))
            .await;
    }
}

/// Initial values of a form's inputs, textareas and selects.
fn form_defaults(form: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();

    for (start, _) in form.match_indices("<input") {
        let tag = &form[start..start + form[start..].find('>').unwrap()];
        if let Some(name) = attr(tag, "name") {
            fields.push((name, attr(tag, "value").unwrap_or_default()));
        }
    }

    for (start, _) in form.match_indices("<textarea") {
        let tag_end = start + form[start..].find('>').unwrap();
        let name = attr(&form[start..tag_end], "name").unwrap();
        let content_end = tag_end + form[tag_end..].find("</textarea>").unwrap();
        fields.push((name, unescape(&form[tag_end + 1..content_end])));
    }

    for (start, _) in form.match_indices("<select") {
        let tag_end = start + form[start..].find('>').unwrap();
        let name = attr(&form[start..tag_end], "name").unwrap();
        let select_end = tag_end + form[tag_end..].find("</select>").unwrap();
        let options: Vec<&str> = form[tag_end..select_end]
            .match_indices("<option")
            .map(|(i, _)| {
                let from = tag_end + i;
                &form[from..from + form[from..].find('>').unwrap()]
            })
            .collect();
        let chosen = options
            .iter()
            .find(|tag| tag.contains(" selected"))
            .or_else(|| options.first());
        if let Some(option) = chosen {
            fields.push((name, attr(option, "value").unwrap_or_default()));
        }
    }

    fields
}

/// Value of `name="..."` within a tag.
fn attr(tag: &str, name: &str) -> Option<String> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(unescape(&tag[start..start + len]))
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

pub fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}
