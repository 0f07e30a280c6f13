//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                    - Service banner
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (store ping)
//!
//! # Auth
//! POST /api/auth/register                   - Create an account
//! POST /api/auth/login                      - Exchange credentials for a token
//! POST /api/auth/logout                     - Stateless; client drops the token
//! POST /api/auth/refresh                    - Re-issue a still-valid token
//! GET  /api/auth/me                         - Caller's profile
//!
//! # Products
//! GET  /api/products                        - Listing (filters, pagination)
//! POST /api/products                        - Create (sellers)
//! GET  /api/products/search                 - Text search
//! GET  /api/products/categories             - Fixed category list
//! GET  /api/products/mine                   - Seller's own products
//! GET  /api/products/{id}                   - Detail
//! PUT  /api/products/{id}                   - Update (owner)
//! DEL  /api/products/{id}                   - Delete (owner)
//!
//! # Cart
//! GET  /api/cart                            - Cart with totals
//! DEL  /api/cart                            - Clear
//! POST /api/cart/items                      - Add a product
//! PUT  /api/cart/items/{product_id}         - Set quantity
//! DEL  /api/cart/items/{product_id}         - Remove a line
//!
//! # Orders
//! GET  /api/orders                          - Caller's orders
//! POST /api/orders                          - Checkout the cart
//! GET  /api/orders/{id}                     - Detail
//! PUT  /api/orders/{id}/status              - Fulfilment update (seller)
//!
//! # Payments
//! POST /api/payments/create-payment-intent
//! POST /api/payments/confirm-payment
//! GET  /api/payments/payment-intent/{id}
//! GET  /api/payments/config
//! ```
//!
//! Each `/api` section is a [`RouteGroup`]. The server mounts all of them;
//! a serverless function mounts exactly one.

pub mod auth;
pub mod cart;
pub mod extract;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Prefix every group is mounted under.
pub const API_PREFIX: &str = "/api";

/// An independently deployable section of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteGroup {
    Auth,
    Products,
    Cart,
    Orders,
    Payments,
}

impl RouteGroup {
    pub const ALL: [Self; 5] = [
        Self::Auth,
        Self::Products,
        Self::Cart,
        Self::Orders,
        Self::Payments,
    ];

    /// Path segment under [`API_PREFIX`].
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Auth => "/auth",
            Self::Products => "/products",
            Self::Cart => "/cart",
            Self::Orders => "/orders",
            Self::Payments => "/payments",
        }
    }

    /// The group's routes, relative to its prefix.
    #[must_use]
    pub fn routes(self) -> Router<AppState> {
        match self {
            Self::Auth => auth::routes(),
            Self::Products => products::routes(),
            Self::Cart => cart::routes(),
            Self::Orders => orders::routes(),
            Self::Payments => payments::routes(),
        }
    }

    /// The group mounted at `/api/<prefix>`.
    #[must_use]
    pub fn router(self) -> Router<AppState> {
        Router::new().nest(&format!("{API_PREFIX}{}", self.prefix()), self.routes())
    }
}

/// Every API group plus the health endpoints.
#[must_use]
pub fn routes() -> Router<AppState> {
    RouteGroup::ALL
        .into_iter()
        .fold(health::routes(), |router, group| router.merge(group.router()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    //! Helpers for driving routers with `oneshot`.

    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use ekart_core::UserType;

    use crate::models::User;
    use crate::services::test_support::stored_user;
    use crate::state::AppState;

    pub async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    /// A stored user and a token for them.
    pub async fn login_as(state: &AppState, email: &str, user_type: UserType) -> (User, String) {
        let user = stored_user(state.stores(), email, user_type).await;
        let token = state.tokens().issue(&user, chrono::Utc::now()).unwrap();
        (user, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = RouteGroup::ALL.iter().map(|g| g.prefix()).collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), RouteGroup::ALL.len());
    }
}
