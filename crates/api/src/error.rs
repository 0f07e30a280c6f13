//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Responses always carry a
//! JSON body `{"error": "<message>"}`; server-side failures are captured to
//! Sentry and answered with a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CartError, OrderError, PaymentError, ProductError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Product(err) => match err {
                ProductError::Validation(_) => StatusCode::BAD_REQUEST,
                ProductError::NotFound(_) => StatusCode::NOT_FOUND,
                ProductError::Forbidden(_) => StatusCode::FORBIDDEN,
                ProductError::Repository(e) => repository_status(e),
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity(_) | CartError::Limit(_) => StatusCode::BAD_REQUEST,
                CartError::ProductNotFound(_) | CartError::ItemNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                CartError::Repository(e) => repository_status(e),
            },
            Self::Order(err) => match err {
                OrderError::EmptyCart
                | OrderError::InvalidAddress(_)
                | OrderError::Amount(_)
                | OrderError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
                OrderError::CartChanged => StatusCode::CONFLICT,
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
                OrderError::Repository(e) => repository_status(e),
            },
            Self::Payment(err) => match err {
                PaymentError::InvalidAmount(_) | PaymentError::EmptyCart => {
                    StatusCode::BAD_REQUEST
                }
                PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
                PaymentError::Forbidden => StatusCode::FORBIDDEN,
                PaymentError::Repository(e) => repository_status(e),
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Server errors never leak their details.
    fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return "Internal server error".to_owned();
        }
        match self {
            Self::Auth(AuthError::InvalidCredentials) => "Invalid email or password".to_owned(),
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this email already exists".to_owned()
            }
            Self::Auth(AuthError::Unauthenticated) => "Not authenticated".to_owned(),
            Self::Auth(AuthError::WeakPassword(msg) | AuthError::InvalidInput(msg))
            | Self::BadRequest(msg)
            | Self::NotFound(msg) => msg.clone(),
            Self::Auth(err) => err.to_string(),
            Self::Product(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Payment(err) => err.to_string(),
            Self::Database(RepositoryError::Conflict(_)) => "Resource already exists".to_owned(),
            Self::Database(err) => err.to_string(),
            Self::Internal(_) => "Internal server error".to_owned(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) | RepositoryError::Stale(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) | AuthError::InvalidInput(_) => {
            StatusCode::BAD_REQUEST
        }
        AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        AuthError::Repository(e) => repository_status(e),
        AuthError::PasswordHash | AuthError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
