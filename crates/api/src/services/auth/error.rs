//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ekart_core::EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Other registration input rejected.
    #[error("{0}")]
    InvalidInput(String),

    /// Missing, malformed, expired, or unresolvable bearer token.
    #[error("not authenticated")]
    Unauthenticated,

    /// Authenticated, but the account lacks the required role.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token could not be produced.
    #[error("token signing error: {0}")]
    Token(#[from] super::token::TokenError),
}
