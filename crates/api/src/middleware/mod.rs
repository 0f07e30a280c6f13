//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (record `x-request-id` in the span and Sentry scope)
//! 4. CORS
//!
//! Authentication is not a layer: handlers that need a caller take the
//! [`CurrentUser`] extractor.

pub mod auth;
pub mod cors;
pub mod request_id;

pub use auth::{CurrentUser, bearer_token};
pub use cors::cors_layer;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
