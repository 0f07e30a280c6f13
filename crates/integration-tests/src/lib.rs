//! End-to-end tests for the EKart API.
//!
//! Each [`TestContext`] serves the full router (every route group plus the
//! health endpoints, behind the production middleware stack) on an
//! ephemeral localhost port over the in-memory store, then talks to it with
//! a real HTTP client. No database is needed.
//!
//! ```bash
//! cargo test -p ekart-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;

use axum::{ServiceExt, extract::Request};
use chrono::Duration;
use reqwest::{Client, Method, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};

use ekart_api::app;
use ekart_api::config::{ApiConfig, LogFormat, StoreConfig};
use ekart_api::db::Stores;
use ekart_api::state::AppState;

/// Origin the test server allows.
pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Password used for every account these tests register.
pub const PASSWORD: &str = "correct horse battery";

fn config() -> ApiConfig {
    ApiConfig {
        store: StoreConfig::Memory,
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        token_secret: SecretString::from("it-Signing-Key-4rT8vQ2mZx7Lp9Wk"),
        token_ttl: Duration::hours(1),
        cors_origins: vec![ALLOWED_ORIGIN.to_owned()],
        payment_publishable_key: "pk_test_integration".to_owned(),
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A running API server and a client pointed at it.
pub struct TestContext {
    pub client: Client,
    pub addr: SocketAddr,
    pub state: AppState,
}

impl TestContext {
    pub async fn new() -> Self {
        let state = AppState::new(config(), Stores::memory());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let service = app::service(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, ServiceExt::<Request>::into_make_service(service))
                .await
                .unwrap();
        });

        Self {
            client: Client::new(),
            addr,
            state,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Send a request and return the raw response.
    pub async fn raw(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.unwrap()
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.raw(method, path, token, body).await;
        let status = response.status();
        let bytes = response.bytes().await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Register an account through the API; returns its token.
    pub async fn register(&self, email: &str, user_type: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": "Test",
                    "last_name": user_type,
                    "user_type": user_type,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {email}: {body}");
        body["access_token"].as_str().unwrap().to_owned()
    }

    /// List a product as `seller`; returns its id.
    pub async fn create_product(&self, seller: &str, title: &str, price: &str, stock: u32) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/products",
                Some(seller),
                Some(json!({
                    "title": title,
                    "category": "electronics",
                    "price": price,
                    "stock_quantity": stock,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create {title}: {body}");
        body["product_id"].as_str().unwrap().to_owned()
    }

    /// Put `quantity` of `product_id` into the caller's cart.
    pub async fn add_to_cart(&self, buyer: &str, product_id: &str, quantity: u32) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/cart/items",
                Some(buyer),
                Some(json!({ "product_id": product_id, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add to cart: {body}");
        body
    }
}

/// A complete shipping address.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "full_name": "Ada Lovelace",
        "address_line_1": "12 St James's Square",
        "city": "London",
        "state": "LDN",
        "postal_code": "SW1Y 4JH",
        "country": "GB",
    })
}
