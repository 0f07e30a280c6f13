//! Data access for EKart.
//!
//! # Stores
//!
//! Every entity is reached through an `async_trait` store trait so services
//! never depend on a concrete backend:
//!
//! - [`UserStore`] - accounts, unique by email
//! - [`ProductStore`] - the seller catalog
//! - [`CartStore`] - one cart document per user
//! - [`OrderStore`] - orders, queryable by buyer or seller
//! - [`PaymentIntentStore`] - mock payment intents
//!
//! Two backends implement all of them: [`postgres::PgStore`] (tables in the
//! `ekart` schema) and [`memory::MemoryStore`] (process-local maps, used by
//! tests and `EKART_STORE=memory`).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p ekart-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use ekart_core::{Email, OrderId, OrderStatus, ProductId, UserId};

use crate::models::{Cart, Order, Page, PaymentIntent, Product, ProductQuery, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The row changed since it was read.
    #[error("stale write: {0}")]
    Stale(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn create(&self, user: &User) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Filter, sort, and page the catalog.
    async fn list(&self, query: &ProductQuery) -> Result<Page<Product>, RepositoryError>;

    async fn create(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Replace a stored product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    async fn update(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Delete a product. Returns whether it existed.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Store the whole cart document, replacing any previous one.
    async fn put(&self, cart: &Cart) -> Result<(), RepositoryError>;

    async fn delete(&self, user_id: UserId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders placed by `buyer`, newest first.
    async fn list_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Orders sold by `seller`, newest first.
    async fn list_for_seller(&self, seller: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Persist every order of one checkout and delete the checked-out cart,
    /// all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Stale` without writing anything if the
    /// stored cart no longer matches `cart`.
    async fn place_orders(&self, cart: &Cart, orders: &[Order]) -> Result<(), RepositoryError>;

    /// Set an order's status (and tracking number, when given).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this id.
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PaymentIntentStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<PaymentIntent>, RepositoryError>;

    /// Insert or replace an intent.
    async fn put(&self, intent: &PaymentIntent) -> Result<(), RepositoryError>;
}

/// Backend liveness, for readiness probes.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// The full set of stores a service layer needs.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub payment_intents: Arc<dyn PaymentIntentStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_backend(Arc::new(PgStore::new(pool)))
    }

    /// Stores backed by process memory. Nothing survives a restart.
    #[must_use]
    pub fn memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::default()))
    }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserStore
            + ProductStore
            + CartStore
            + OrderStore
            + PaymentIntentStore
            + StoreHealth
            + 'static,
    {
        Self {
            users: backend.clone(),
            products: backend.clone(),
            carts: backend.clone(),
            orders: backend.clone(),
            payment_intents: backend.clone(),
            health: backend,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
