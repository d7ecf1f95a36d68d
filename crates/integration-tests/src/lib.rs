//! Integration tests for the storefront cart widget.
//!
//! Tests drive the full router in-process with `tower::ServiceExt::oneshot`,
//! carrying cookies between requests the way a browser would.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storefront-cart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - Shopper flows through the widget
//! - `storefront_routes` - HTTP surface: status codes, headers, fragments

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::BTreeMap;
use std::path::Path;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use tokio::task::JoinSet;
use tower::ServiceExt;

use storefront_cart::config::{StorefrontConfig, WidgetConfig};
use storefront_cart::content::{ContentStore, ProductCard};
use storefront_cart::state::AppState;

/// Response body cap for tests.
const BODY_LIMIT: usize = 1024 * 1024;

/// Configuration for an in-process storefront.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        catalog_path: None,
        widget: WidgetConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Product cards used by the tests.
#[must_use]
pub fn test_products() -> Vec<ProductCard> {
    vec![
        ProductCard {
            name: "Sneaker A".to_string(),
            price: "$49.99".to_string(),
            image: "/static/images/sneaker-a.png".to_string(),
        },
        ProductCard {
            name: "Boot B".to_string(),
            price: "$25.50".to_string(),
            image: "/static/images/boot-b.png".to_string(),
        },
    ]
}

/// A response reduced to what the tests look at.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Build a fresh storefront with the test cards.
#[must_use]
pub fn test_app() -> Router {
    let state = AppState::with_content(test_config(), ContentStore::from_cards(test_products()));
    let static_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../storefront/static");
    storefront_cart::app(state, &static_dir)
}

/// One shopper's browser talking to an in-process storefront.
pub struct TestBrowser {
    app: Router,
    cookies: BTreeMap<String, String>,
}

impl TestBrowser {
    /// Start a browser against a fresh storefront.
    #[must_use]
    pub fn new() -> Self {
        Self {
            app: test_app(),
            cookies: BTreeMap::new(),
        }
    }

    /// A second browser on the same storefront, with no cookies yet.
    #[must_use]
    pub fn another_browser(&self) -> Self {
        Self {
            app: self.app.clone(),
            cookies: BTreeMap::new(),
        }
    }

    /// Replace the storefront with a freshly started one, keeping this
    /// browser's cookies.
    pub fn restart_host(&mut self) {
        self.app = test_app();
    }

    /// Value of the cookie `name`, if the browser holds one.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn store_cookies(&mut self, headers: &HeaderMap) {
        for set_cookie in headers.get_all(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            self.cookies
                .insert(name.trim().to_string(), value.trim().to_string());
        }
    }

    /// Send a request, keeping whatever cookies the server sets.
    pub async fn send(&mut self, method: Method, uri: &str, form: Option<&str>) -> TestResponse {
        let response = send_request(
            self.app.clone(),
            self.cookie_header(),
            method,
            uri,
            form.map(str::to_string),
        )
        .await;
        self.store_cookies(&response.headers);
        response
    }

    /// Send every form to `/cart/events` at once with the current cookies.
    ///
    /// Cookies from the responses are applied in completion order.
    pub async fn click_concurrently(&mut self, forms: Vec<String>) -> Vec<TestResponse> {
        let cookie = self.cookie_header();
        let mut requests = JoinSet::new();
        for form in forms {
            requests.spawn(send_request(
                self.app.clone(),
                cookie.clone(),
                Method::POST,
                "/cart/events",
                Some(form),
            ));
        }

        let mut responses = Vec::new();
        while let Some(response) = requests.join_next().await {
            let response = response.unwrap();
            self.store_cookies(&response.headers);
            responses.push(response);
        }
        responses
    }

    /// Load the storefront page.
    pub async fn open_page(&mut self) -> TestResponse {
        self.send(Method::GET, "/", None).await
    }

    /// Click a widget control, as the delegated listener would post it.
    pub async fn click(&mut self, form: &str) -> TestResponse {
        self.send(Method::POST, "/cart/events", Some(form)).await
    }

    /// Click the add control on a card.
    pub async fn add(&mut self, card: &ProductCard) -> TestResponse {
        self.click(&add_form(card)).await
    }
}

impl Default for TestBrowser {
    fn default() -> Self {
        Self::new()
    }
}

/// Form body of a card's add control.
#[must_use]
pub fn add_form(card: &ProductCard) -> String {
    format!(
        "action=add&name={}&price={}&image={}",
        urlencoding::encode(&card.name),
        urlencoding::encode(&card.price),
        urlencoding::encode(&card.image)
    )
}

async fn send_request(
    app: Router,
    cookie: Option<String>,
    method: Method,
    uri: &str,
    form: Option<String>,
) -> TestResponse {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let request = match form {
        Some(form) => request
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form)),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .unwrap();

    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

/// Ids of every `data-action="{action}"` control in `html`, in order.
#[must_use]
pub fn control_ids(html: &str, action: &str) -> Vec<i64> {
    let marker = format!("data-action=\"{action}\" data-id=\"");
    html.match_indices(&marker)
        .filter_map(|(start, _)| {
            let rest = html.get(start + marker.len()..)?;
            let end = rest.find('"')?;
            rest.get(..end)?.parse().ok()
        })
        .collect()
}
