//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, signed bearer tokens, role guards
//! - `products` - Catalog CRUD with seller ownership checks
//! - `cart` - Cart mutations with price snapshots
//! - `orders` - Checkout (split per seller) and fulfilment status
//! - `payments` - Mock payment intents
//!
//! Services borrow their stores for the duration of one call, so handlers
//! build them on demand from [`crate::state::AppState`].

pub mod auth;
pub mod cart;
pub mod orders;
pub mod payments;
pub mod products;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use orders::{OrderError, OrderService};
pub use payments::{PaymentError, PaymentService};
pub use products::{ProductError, ProductService};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    //! Fixtures shared by service, store, and route tests.

    use chrono::Utc;

    use ekart_core::{CurrencyCode, Email, Money, UserId, UserType};

    use crate::db::Stores;
    use crate::models::{NewProduct, NewUser, Product, User};

    pub fn user(email: &str, user_type: UserType) -> User {
        User::create(
            NewUser {
                email: Email::parse(email).unwrap(),
                password_hash: "not-a-real-hash".to_owned(),
                first_name: "Test".to_owned(),
                last_name: "User".to_owned(),
                phone: None,
                user_type,
            },
            Utc::now(),
        )
    }

    /// Store a user and return it.
    pub async fn stored_user(stores: &Stores, email: &str, user_type: UserType) -> User {
        let user = user(email, user_type);
        stores.users.create(&user).await.unwrap();
        user
    }

    pub fn sample_product(seller_id: UserId) -> Product {
        priced_product(seller_id, "Desk Lamp", "24.99")
    }

    pub fn priced_product(seller_id: UserId, title: &str, price: &str) -> Product {
        Product::create(
            seller_id,
            NewProduct {
                title: title.to_owned(),
                description: "A product".to_owned(),
                category: "home".to_owned(),
                price: Money::new(price.parse().unwrap()),
                currency: CurrencyCode::USD,
                stock_quantity: 10,
                images: vec![],
                variants: vec![],
                tags: vec![],
                brand: None,
            },
            10,
            Utc::now(),
        )
    }

    /// Store a product and return it.
    pub async fn stored_product(stores: &Stores, seller_id: UserId, title: &str, price: &str) -> Product {
        let product = priced_product(seller_id, title, price);
        stores.products.create(&product).await.unwrap();
        product
    }
}
