//! Cart service.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use ekart_core::{ProductId, UserId};

use crate::db::{CartStore, ProductStore, RepositoryError};
use crate::models::{Cart, CartItem, CartLimitError, MAX_QUANTITY};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("{0}")]
    InvalidQuantity(String),

    /// The product does not exist or is no longer listed.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),

    #[error(transparent)]
    Limit(#[from] CartLimitError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart operations for one request.
pub struct CartService<'a> {
    carts: &'a dyn CartStore,
    products: &'a dyn ProductStore,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(carts: &'a dyn CartStore, products: &'a dyn ProductStore) -> Self {
        Self { carts, products }
    }

    /// The user's cart, or a fresh empty one (not persisted) if none exists.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, CartError> {
        let cart = self.carts.get(user_id).await.inspect_err(|e| {
            tracing::error!(error = %e, %user_id, "Failed to load cart");
        })?;
        Ok(cart.unwrap_or_else(|| Cart::empty(user_id, Utc::now())))
    }

    /// Add `quantity` units of a product, merging with an existing line.
    ///
    /// The line snapshots the product's current title, price, and seller.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is not positive.
    /// Returns `CartError::ProductNotFound` if the product is missing or inactive.
    /// Returns `CartError::Limit` if the merged line or the cart total would
    /// exceed what can be stored; nothing is saved.
    #[instrument(skip(self), fields(%user_id, %product_id))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity(
                "quantity must be at least 1".to_owned(),
            ));
        }
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q <= MAX_QUANTITY)
            .ok_or(CartLimitError::Quantity)?;

        let product = self
            .products
            .get(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CartError::ProductNotFound(product_id))?;

        let mut cart = self.get(user_id).await?;
        cart.add(CartItem::from_product(&product, quantity, Utc::now()))?;
        self.carts.put(&cart).await?;

        tracing::debug!(lines = cart.items.len(), "Added item to cart");
        Ok(cart)
    }

    /// Remove a product's line. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self), fields(%user_id, %product_id))]
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<Cart, CartError> {
        let mut cart = self.get(user_id).await?;
        if cart.remove(product_id, Utc::now()) {
            self.carts.put(&cart).await?;
        }
        Ok(cart)
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the product is not in the cart.
    /// Returns `CartError::Limit` if the quantity or the resulting total is
    /// too large.
    #[instrument(skip(self), fields(%user_id, %product_id))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        let mut cart = self.get(user_id).await?;
        if !cart.set_quantity(product_id, quantity, Utc::now())? {
            return Err(CartError::ItemNotFound(product_id));
        }
        self.carts.put(&cart).await?;
        Ok(cart)
    }

    /// Delete the whole cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self), fields(%user_id))]
    pub async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        self.carts.delete(user_id).await?;
        Ok(())
    }
}
