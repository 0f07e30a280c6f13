//! Account management commands.
//!
//! ```bash
//! # Admins can only be created here; the API refuses admin self-registration
//! ekart-cli user create -e ops@ekart.dev -p 'long-enough-password' -t admin
//! ```

use chrono::Utc;
use thiserror::Error;

use ekart_api::db::{PgStore, RepositoryError, UserStore};
use ekart_api::models::{NewUser, User};
use ekart_api::services::auth::{AuthError, hash_password};
use ekart_core::{Email, EmailError, UserId, UserType};

use super::ConnectError;

/// Shortest password the CLI accepts, matching registration.
const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid user type: {0}. Valid types: buyer, seller, admin")]
    InvalidUserType(String),

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    #[error("User already exists with email: {0}")]
    UserExists(Email),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] AuthError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Arguments to `user create`.
#[derive(Debug)]
pub struct CreateUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub user_type: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Validate the arguments into an account ready to store.
fn build_user(args: &CreateUser<'_>) -> Result<User, UserError> {
    let email = Email::parse(args.email)?;
    let user_type: UserType = args
        .user_type
        .parse()
        .map_err(|_| UserError::InvalidUserType(args.user_type.to_owned()))?;
    if args.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserError::WeakPassword);
    }

    Ok(User::create(
        NewUser {
            email,
            password_hash: hash_password(args.password)?,
            first_name: args.first_name.trim().to_owned(),
            last_name: args.last_name.trim().to_owned(),
            phone: None,
            user_type,
        },
        Utc::now(),
    ))
}

/// Create an account of any type.
pub async fn create(args: &CreateUser<'_>) -> Result<UserId, UserError> {
    let user = build_user(args)?;

    let pool = super::connect().await?;
    let users = PgStore::new(pool);

    tracing::info!("Creating {} account: {}", user.user_type, user.email);
    users.create(&user).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => UserError::UserExists(user.email.clone()),
        other => UserError::Repository(other),
    })?;

    tracing::info!(user_id = %user.id, "Account created");
    Ok(user.id)
}
