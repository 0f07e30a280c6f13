//! Shopping cart.
//!
//! A cart holds at most one line per product. The total is never stored; it
//! is always derived from the lines with exact decimal arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ekart_core::{Money, MoneyError, ProductId, UserId};

use super::Product;

/// Largest quantity a line may hold (the `INTEGER` column limit).
pub const MAX_QUANTITY: u32 = 2_147_483_647;

/// A mutation that would push the cart past what can be stored or ordered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartLimitError {
    #[error("quantity must be at most {MAX_QUANTITY}")]
    Quantity,

    #[error("cart total must not exceed {}", Money::MAX)]
    Total,
}

/// One cart line, with the product's price and title captured when the line
/// was first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Money,
    pub quantity: u32,
    pub seller_id: UserId,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Snapshot `product` into a new line.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32, now: DateTime<Utc>) -> Self {
        Self {
            product_id: product.product_id,
            product_name: product.title.clone(),
            price: product.price,
            quantity,
            seller_id: product.seller_id,
            added_at: now,
        }
    }

    /// `price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::OutOfRange` on overflow.
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.price.times(self.quantity)
    }
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// A fresh cart with no lines.
    #[must_use]
    pub const fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line for `product_id`.
    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Add a line, or grow the existing line for the same product.
    ///
    /// An existing line keeps its original price snapshot. On error the cart
    /// is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CartLimitError` if the merged quantity or the cart total
    /// would exceed its limit.
    pub fn add(&mut self, item: CartItem) -> Result<(), CartLimitError> {
        let mut next = self.clone();
        next.updated_at = item.added_at;
        match next.items.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or(CartLimitError::Quantity)?;
            }
            None => next.items.push(item),
        }
        next.check_limits()?;
        *self = next;
        Ok(())
    }

    /// Drop the line for `product_id`. Returns whether a line was removed;
    /// removing an absent product leaves the cart untouched.
    pub fn remove(&mut self, product_id: ProductId, now: DateTime<Utc>) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        let removed = self.items.len() != before;
        if removed {
            self.updated_at = now;
        }
        removed
    }

    /// Set a line's quantity; zero or negative removes the line.
    ///
    /// Returns `Ok(false)` (and changes nothing) if the product is not in the
    /// cart.
    ///
    /// # Errors
    ///
    /// Returns `CartLimitError` if the new quantity or the resulting total
    /// exceeds its limit; the cart is left unchanged.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, CartLimitError> {
        let Some(pos) = self.items.iter().position(|i| i.product_id == product_id) else {
            return Ok(false);
        };
        let mut next = self.clone();
        if quantity <= 0 {
            next.items.remove(pos);
        } else if let Some(item) = next.items.get_mut(pos) {
            item.quantity = u32::try_from(quantity).map_err(|_| CartLimitError::Quantity)?;
        }
        next.updated_at = now;
        next.check_limits()?;
        *self = next;
        Ok(true)
    }

    fn check_limits(&self) -> Result<(), CartLimitError> {
        if self.items.iter().any(|i| i.quantity > MAX_QUANTITY) {
            return Err(CartLimitError::Quantity);
        }
        self.total()
            .and_then(Money::within_limit)
            .map(|_| ())
            .map_err(|_| CartLimitError::Total)
    }

    /// Σ price × quantity over all lines.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::OutOfRange` on overflow.
    pub fn total(&self) -> Result<Money, MoneyError> {
        self.items
            .iter()
            .try_fold(Money::ZERO, |sum, item| sum.checked_add(item.line_total()?))
    }

    /// Total number of units across lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Group lines by seller, in order of each seller's first line. Line order
    /// within a group follows the cart.
    #[must_use]
    pub fn split_by_seller(&self) -> Vec<(UserId, Vec<CartItem>)> {
        let mut groups: Vec<(UserId, Vec<CartItem>)> = Vec::new();
        for item in &self.items {
            match groups.iter_mut().find(|(seller, _)| *seller == item.seller_id) {
                Some((_, items)) => items.push(item.clone()),
                None => groups.push((item.seller_id, vec![item.clone()])),
            }
        }
        groups
    }
}

/// The cart as returned to clients, with derived totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub total_amount: Money,
    pub item_count: u64,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Cart> for CartSummary {
    type Error = MoneyError;

    fn try_from(cart: Cart) -> Result<Self, Self::Error> {
        Ok(Self {
            total_amount: cart.total()?,
            item_count: cart.item_count(),
            user_id: cart.user_id,
            updated_at: cart.updated_at,
            items: cart.items,
        })
    }
}
