//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ekart_core::{Email, UserId, UserType};

/// A registered account.
///
/// Never serialized directly; handlers return a [`UserProfile`] so the
/// password hash cannot leak into a response body.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email (normalized, unique).
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    pub is_active: bool,
    /// Sellers may only list products once verified.
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new account from registration input.
    #[must_use]
    pub fn create(new: NewUser, now: DateTime<Utc>) -> Self {
        // Sellers start verified in this deployment; there is no review queue.
        Self {
            id: UserId::new(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            phone: new.phone,
            user_type: new.user_type,
            is_active: true,
            is_verified: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// "First Last", trimmed when either part is empty.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }

    /// Whether the user can list products and fulfil orders.
    #[must_use]
    pub fn is_verified_seller(&self) -> bool {
        self.user_type == UserType::Seller && self.is_verified
    }

    /// The public view of this account.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.id,
            email: self.email.clone(),
            full_name: self.full_name(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            user_type: self.user_type,
            is_active: self.is_active,
            is_verified: self.is_verified,
            seller_verified: self.is_verified_seller(),
            created_at: self.created_at,
        }
    }
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub user_type: UserType,
}

/// Account data safe to return to clients.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: Email,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    pub is_active: bool,
    pub is_verified: bool,
    pub seller_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_user(user_type: UserType) -> User {
        User::create(
            NewUser {
                email: Email::parse("jo@ekart.dev").unwrap(),
                password_hash: "$argon2id$stub".to_owned(),
                first_name: "Jo".to_owned(),
                last_name: String::new(),
                phone: None,
                user_type,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_full_name_trims_missing_parts() {
        assert_eq!(new_user(UserType::Buyer).full_name(), "Jo");
    }

    #[test]
    fn test_only_sellers_are_verified_sellers() {
        assert!(!new_user(UserType::Buyer).is_verified_seller());
        assert!(!new_user(UserType::Admin).is_verified_seller());
        assert!(new_user(UserType::Seller).is_verified_seller());

        let mut unverified = new_user(UserType::Seller);
        unverified.is_verified = false;
        assert!(!unverified.is_verified_seller());
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let json = serde_json::to_value(new_user(UserType::Buyer).profile()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["user_type"], "buyer");
        assert_eq!(json["email"], "jo@ekart.dev");
    }
}
