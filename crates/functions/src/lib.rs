//! EKart API as serverless functions.
//!
//! Each binary serves one [`RouteGroup`](ekart_api::routes::RouteGroup)
//! behind API Gateway:
//!
//! | Binary         | Routes             |
//! |----------------|--------------------|
//! | `auth-api`     | `/api/auth/*`      |
//! | `products-api` | `/api/products/*`  |
//! | `cart-api`     | `/api/cart/*`      |
//! | `orders-api`   | `/api/orders/*`    |
//! | `payments-api` | `/api/payments/*`  |
//!
//! The proxy event is turned into an HTTP request, run through the same
//! router the monolith mounts, and the response is folded back into the
//! `{statusCode, headers, body}` shape API Gateway expects.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod event;
pub mod handler;
pub mod response;

pub use event::{EventError, into_request};
pub use handler::{FunctionHandler, run};
pub use response::ApiGatewayResponse;
