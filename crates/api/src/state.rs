//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Stores;
use crate::services::auth::TokenSigner;
use crate::services::{AuthService, CartService, OrderService, PaymentService, ProductService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services are built per call from the
/// stores held here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    stores: Stores,
    tokens: TokenSigner,
}

impl AppState {
    /// Create a new application state over `stores`.
    #[must_use]
    pub fn new(config: ApiConfig, stores: Stores) -> Self {
        let tokens = TokenSigner::new(config.token_secret.clone(), config.token_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.stores.users.as_ref(), &self.inner.tokens)
    }

    #[must_use]
    pub fn products(&self) -> ProductService<'_> {
        ProductService::new(self.inner.stores.products.as_ref())
    }

    #[must_use]
    pub fn cart(&self) -> CartService<'_> {
        let stores = &self.inner.stores;
        CartService::new(stores.carts.as_ref(), stores.products.as_ref())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        let stores = &self.inner.stores;
        OrderService::new(stores.carts.as_ref(), stores.orders.as_ref())
    }

    #[must_use]
    pub fn payments(&self) -> PaymentService<'_> {
        let stores = &self.inner.stores;
        PaymentService::new(stores.payment_intents.as_ref(), stores.carts.as_ref())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
