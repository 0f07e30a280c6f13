//! Orders.
//!
//! Checkout turns one cart into one order per seller. Each order carries only
//! that seller's lines and its own total.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ekart_core::{
    CurrencyCode, Money, MoneyError, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, UserId,
};

use super::{Cart, CartItem};

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Name of the first required field that is blank, if any.
    #[must_use]
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("full_name", &self.full_name),
            ("address_line_1", &self.address_line_1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// A purchased line, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub seller_id: UserId,
}

impl TryFrom<CartItem> for OrderItem {
    type Error = MoneyError;

    fn try_from(item: CartItem) -> Result<Self, Self::Error> {
        Ok(Self {
            total_price: item.line_total()?,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: item.price,
            seller_id: item.seller_id,
        })
    }
}

/// Buyer-supplied checkout details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Checkout {
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A single-seller order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub currency: CurrencyCode,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether `user` is this order's buyer or seller.
    #[must_use]
    pub fn involves(&self, user: UserId) -> bool {
        self.buyer_id == user || self.seller_id == user
    }

    /// Split `cart` into pending orders, one per seller, in order of each
    /// seller's first line. Returns nothing for an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError` if a line or order total overflows or an order
    /// total exceeds `Money::MAX`.
    pub fn split_cart(
        cart: &Cart,
        checkout: &Checkout,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, MoneyError> {
        cart.split_by_seller()
            .into_iter()
            .map(|(seller_id, lines)| {
                let items = lines
                    .into_iter()
                    .map(OrderItem::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                let total_amount = Money::try_sum(items.iter().map(|i| i.total_price))?
                    .within_limit()?;
                Ok(Self {
                    order_id: OrderId::new(),
                    buyer_id: cart.user_id,
                    seller_id,
                    total_amount,
                    items,
                    currency: CurrencyCode::default(),
                    status: OrderStatus::Pending,
                    payment_status: PaymentStatus::Pending,
                    payment_method: checkout.payment_method,
                    shipping_address: checkout.shipping_address.clone(),
                    notes: checkout.notes.clone(),
                    tracking_number: None,
                    created_at: now,
                    updated_at: now,
                })
            })
            .collect()
    }
}
