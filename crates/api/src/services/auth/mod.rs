//! Authentication service.
//!
//! Password accounts (Argon2id) with stateless signed bearer tokens.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenError, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use ekart_core::{Email, UserId, UserType};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length of a name field.
const MAX_NAME_LENGTH: usize = 100;

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user_id: UserId,
    pub email: Email,
    pub user_type: UserType,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    tokens: &'a TokenSigner,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, tokens: &'a TokenSigner) -> Self {
        Self { users, tokens }
    }

    /// Register a new account and issue its first token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidInput` for an admin self-registration or oversized names.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<AuthResponse, AuthError> {
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;

        if registration.user_type == UserType::Admin {
            return Err(AuthError::InvalidInput(
                "admin accounts cannot be self-registered".to_owned(),
            ));
        }
        let first_name = validate_name("first_name", &registration.first_name)?;
        let last_name = validate_name("last_name", &registration.last_name)?;

        let password_hash = hash_password(&registration.password)?;
        let user = User::create(
            NewUser {
                email,
                password_hash,
                first_name,
                last_name,
                phone: registration.phone.filter(|p| !p.trim().is_empty()),
                user_type: registration.user_type,
            },
            Utc::now(),
        );

        self.users.create(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(user_id = %user.id, user_type = %user.user_type, "User registered");
        self.respond(&user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// or the account is deactivated.
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.respond(&user)
    }

    /// Resolve a bearer token to its (active) user.
    ///
    /// Fails closed: every failure, including store errors, is
    /// `AuthError::Unauthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the token cannot be resolved.
    pub async fn resolve(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(token, Utc::now()).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AuthError::Unauthenticated
        })?;

        match self.users.get(claims.sub).await {
            Ok(Some(user)) if user.is_active => Ok(user),
            Ok(_) => Err(AuthError::Unauthenticated),
            Err(e) => {
                tracing::error!(error = %e, user_id = %claims.sub, "Token user lookup failed");
                Err(AuthError::Unauthenticated)
            }
        }
    }

    /// Exchange a still-valid token for a fresh one with a full lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the token does not resolve.
    #[instrument(skip_all)]
    pub async fn refresh(&self, token: &str) -> Result<AuthResponse, AuthError> {
        let user = self.resolve(token).await?;
        tracing::debug!(user_id = %user.id, "Token refreshed");
        self.respond(&user)
    }

    fn respond(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let access_token = self.tokens.issue(user, Utc::now())?;
        Ok(AuthResponse {
            access_token,
            token_type: "bearer",
            expires_in: self.tokens.ttl().num_seconds(),
            user_id: user.id,
            email: user.email.clone(),
            user_type: user.user_type,
        })
    }
}

/// Require a verified seller account.
///
/// # Errors
///
/// Returns `AuthError::Forbidden` for any other account.
pub fn require_seller(user: &User) -> Result<(), AuthError> {
    if user.is_verified_seller() {
        Ok(())
    } else {
        Err(AuthError::Forbidden("seller account required"))
    }
}

/// Require an admin account.
///
/// # Errors
///
/// Returns `AuthError::Forbidden` for any other account.
pub fn require_admin(user: &User) -> Result<(), AuthError> {
    if user.user_type == UserType::Admin {
        Ok(())
    } else {
        Err(AuthError::Forbidden("admin account required"))
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "{field} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(value.to_owned())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use secrecy::SecretString;

    use super::*;
    use crate::db::Stores;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            SecretString::from("k7Qp2vX9mZ4rT8wL1nB6cF3hJ5dS0gYa".to_owned()),
            Duration::hours(24),
        )
    }

    fn registration(email: &str, user_type: UserType) -> Registration {
        Registration {
            email: email.to_owned(),
            password: "correct horse".to_owned(),
            first_name: "Sam".to_owned(),
            last_name: "Seller".to_owned(),
            phone: None,
            user_type,
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2hunter2", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_resolve() {
        let stores = Stores::memory();
        let tokens = signer();
        let auth = AuthService::new(stores.users.as_ref(), &tokens);

        let response = auth
            .register(registration("Sam@EKart.dev", UserType::Seller))
            .await
            .unwrap();
        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.email.as_str(), "sam@ekart.dev");

        let user = auth.resolve(&response.access_token).await.unwrap();
        assert_eq!(user.id, response.user_id);
        assert!(user.is_verified_seller());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let stores = Stores::memory();
        let tokens = signer();
        let auth = AuthService::new(stores.users.as_ref(), &tokens);

        auth.register(registration("dup@ekart.dev", UserType::Buyer))
            .await
            .unwrap();
        let err = auth
            .register(registration("DUP@ekart.dev", UserType::Buyer))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_admin_cannot_self_register() {
        let stores = Stores::memory();
        let tokens = signer();
        let auth = AuthService::new(stores.users.as_ref(), &tokens);

        let err = auth
            .register(registration("root@ekart.dev", UserType::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_email_look_alike() {
        let stores = Stores::memory();
        let tokens = signer();
        let auth = AuthService::new(stores.users.as_ref(), &tokens);
        auth.register(registration("jo@ekart.dev", UserType::Buyer))
            .await
            .unwrap();

        let wrong = auth.login("jo@ekart.dev", "not the password").await.unwrap_err();
        let unknown = auth.login("nobody@ekart.dev", "correct horse").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());

        assert!(auth.login(" JO@ekart.dev", "correct horse").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_fails_closed() {
        let stores = Stores::memory();
        let tokens = signer();
        let auth = AuthService::new(stores.users.as_ref(), &tokens);

        assert!(matches!(
            auth.resolve("garbage").await,
            Err(AuthError::Unauthenticated)
        ));

        // Validly signed, but the user was never stored.
        let ghost = crate::services::test_support::user("ghost@ekart.dev", UserType::Buyer);
        let token = tokens.issue(&ghost, Utc::now()).unwrap();
        assert!(matches!(
            auth.resolve(&token).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_deactivated_account_cannot_log_in_or_use_tokens() {
        let stores = Stores::memory();
        let tokens = signer();
        let auth = AuthService::new(stores.users.as_ref(), &tokens);

        let mut user = crate::services::test_support::user("gone@ekart.dev", UserType::Buyer);
        user.password_hash = hash_password("correct horse").unwrap();
        user.is_active = false;
        stores.users.create(&user).await.unwrap();

        assert!(matches!(
            auth.login("gone@ekart.dev", "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));

        let token = tokens.issue(&user, Utc::now()).unwrap();
        assert!(matches!(
            auth.resolve(&token).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            auth.refresh(&token).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_refresh_extends_a_valid_token_only() {
        let stores = Stores::memory();
        let tokens = signer();
        let auth = AuthService::new(stores.users.as_ref(), &tokens);
        let registered = auth
            .register(registration("kim@ekart.dev", UserType::Buyer))
            .await
            .unwrap();
        let user = auth.resolve(&registered.access_token).await.unwrap();

        let aging = tokens.issue(&user, Utc::now() - Duration::hours(20)).unwrap();
        let refreshed = auth.refresh(&aging).await.unwrap();
        assert_eq!(refreshed.user_id, user.id);

        let old = tokens.verify(&aging, Utc::now()).unwrap();
        let new = tokens.verify(&refreshed.access_token, Utc::now()).unwrap();
        assert!(new.exp >= old.exp + Duration::hours(19).num_seconds());

        let expired = tokens.issue(&user, Utc::now() - Duration::hours(25)).unwrap();
        assert!(matches!(
            auth.refresh(&expired).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            auth.refresh("garbage").await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_role_guards() {
        let buyer = crate::services::test_support::user("b@ekart.dev", UserType::Buyer);
        let seller = crate::services::test_support::user("s@ekart.dev", UserType::Seller);
        let admin = crate::services::test_support::user("a@ekart.dev", UserType::Admin);

        assert!(require_seller(&seller).is_ok());
        assert!(matches!(require_seller(&buyer), Err(AuthError::Forbidden(_))));
        assert!(require_admin(&admin).is_ok());
        assert!(require_admin(&seller).is_err());
    }
}
