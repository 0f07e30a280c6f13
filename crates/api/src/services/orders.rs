//! Order service: checkout and fulfilment.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use ekart_core::{MoneyError, OrderId, OrderStatus, UserType};

use super::auth::{self, AuthError};
use crate::db::{CartStore, OrderStore, RepositoryError};
use crate::models::{Checkout, Order, User};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("shipping address is missing {0}")]
    InvalidAddress(&'static str),

    #[error("order total: {0}")]
    Amount(#[from] MoneyError),

    #[error("cart changed during checkout; review it and try again")]
    CartChanged,

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<AuthError> for OrderError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden(msg) => Self::Forbidden(msg),
            AuthError::Repository(e) => Self::Repository(e),
            _ => Self::Forbidden("not permitted"),
        }
    }
}

/// Order operations for one request.
pub struct OrderService<'a> {
    carts: &'a dyn CartStore,
    orders: &'a dyn OrderStore,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(carts: &'a dyn CartStore, orders: &'a dyn OrderStore) -> Self {
        Self { carts, orders }
    }

    /// Check out the buyer's cart: one pending order per seller, then the
    /// cart is cleared. Orders and the cart deletion commit together.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidAddress` if a required address field is blank.
    /// Returns `OrderError::EmptyCart` if there is nothing to order; no orders
    /// are created.
    /// Returns `OrderError::CartChanged` if the cart was modified between
    /// reading it and placing the orders; nothing is written.
    #[instrument(skip(self, buyer, checkout), fields(buyer_id = %buyer.id))]
    pub async fn create(&self, buyer: &User, checkout: Checkout) -> Result<Vec<Order>, OrderError> {
        if let Some(field) = checkout.shipping_address.first_missing_field() {
            return Err(OrderError::InvalidAddress(field));
        }

        let cart = self
            .carts
            .get(buyer.id)
            .await?
            .filter(|c| !c.is_empty())
            .ok_or(OrderError::EmptyCart)?;

        let orders = Order::split_cart(&cart, &checkout, Utc::now())?;
        self.orders
            .place_orders(&cart, &orders)
            .await
            .map_err(|e| match e {
                RepositoryError::Stale(_) => OrderError::CartChanged,
                other => OrderError::Repository(other),
            })?;

        tracing::info!(orders = orders.len(), "Orders placed");
        Ok(orders)
    }

    /// Sellers see what they sold; everyone else sees what they bought.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list(&self, user: &User) -> Result<Vec<Order>, OrderError> {
        let orders = if user.user_type == UserType::Seller {
            self.orders.list_for_seller(user.id).await?
        } else {
            self.orders.list_for_buyer(user.id).await?
        };
        Ok(orders)
    }

    /// Fetch an order visible to `user` (its buyer, its seller, or an admin).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::Forbidden`.
    pub async fn get(&self, user: &User, id: OrderId) -> Result<Order, OrderError> {
        let order = self.orders.get(id).await?.ok_or(OrderError::NotFound(id))?;
        if !order.involves(user.id) && auth::require_admin(user).is_err() {
            return Err(OrderError::Forbidden("not your order"));
        }
        Ok(order)
    }

    /// Move an order along its fulfilment path. Only the order's seller may.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` unless `seller` is a seller and owns the order.
    /// Returns `OrderError::InvalidTransition` if the status graph forbids the move.
    #[instrument(skip(self, seller, tracking_number), fields(seller_id = %seller.id))]
    pub async fn update_status(
        &self,
        seller: &User,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Order, OrderError> {
        auth::require_seller(seller)?;

        let mut order = self.orders.get(id).await?.ok_or(OrderError::NotFound(id))?;
        if order.seller_id != seller.id {
            return Err(OrderError::Forbidden("only the order's seller can update it"));
        }
        if !order.status.can_transition_to(status) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: status,
            });
        }

        let now = Utc::now();
        let tracking_number = tracking_number.filter(|t| !t.trim().is_empty());
        self.orders
            .update_status(id, status, tracking_number.as_deref(), now)
            .await?;

        tracing::info!(from = %order.status, to = %status, "Order status updated");
        order.status = status;
        if tracking_number.is_some() {
            order.tracking_number = tracking_number;
        }
        order.updated_at = now;
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ekart_core::{Money, PaymentMethod, PaymentStatus};

    use super::*;
    use crate::db::Stores;
    use crate::models::order::tests::address;
    use crate::services::CartService;
    use crate::services::test_support::{stored_product, stored_user};

    fn money(s: &str) -> Money {
        Money::new(s.parse().unwrap())
    }

    fn checkout() -> Checkout {
        Checkout {
            shipping_address: address(),
            payment_method: PaymentMethod::Card,
            notes: Some("leave at door".to_owned()),
        }
    }

    struct Fixture {
        stores: Stores,
        buyer: User,
        s1: User,
        s2: User,
    }

    /// Buyer with S1's product A (10.00 × 2) and S2's product B (5.00 × 1).
    async fn two_seller_cart() -> Fixture {
        let stores = Stores::memory();
        let buyer = stored_user(&stores, "buyer@ekart.dev", UserType::Buyer).await;
        let s1 = stored_user(&stores, "s1@ekart.dev", UserType::Seller).await;
        let s2 = stored_user(&stores, "s2@ekart.dev", UserType::Seller).await;
        let a = stored_product(&stores, s1.id, "A", "10.00").await;
        let b = stored_product(&stores, s2.id, "B", "5.00").await;

        let cart = CartService::new(stores.carts.as_ref(), stores.products.as_ref());
        cart.add_item(buyer.id, a.product_id, 2).await.unwrap();
        cart.add_item(buyer.id, b.product_id, 1).await.unwrap();

        Fixture { stores, buyer, s1, s2 }
    }

    #[tokio::test]
    async fn test_create_splits_per_seller_and_clears_cart() {
        let f = two_seller_cart().await;
        let service = OrderService::new(f.stores.carts.as_ref(), f.stores.orders.as_ref());

        let orders = service.create(&f.buyer, checkout()).await.unwrap();
        assert_eq!(orders.len(), 2);

        let o1 = orders.iter().find(|o| o.seller_id == f.s1.id).unwrap();
        let o2 = orders.iter().find(|o| o.seller_id == f.s2.id).unwrap();
        assert_eq!(o1.total_amount, money("20.00"));
        assert_eq!(o2.total_amount, money("5.00"));
        assert_eq!(o1.items.len(), 1);
        assert_eq!(o1.status, OrderStatus::Pending);
        assert_eq!(o1.payment_status, PaymentStatus::Pending);
        assert_eq!(o1.notes.as_deref(), Some("leave at door"));

        assert!(f.stores.carts.get(f.buyer.id).await.unwrap().is_none());
        assert_eq!(service.list(&f.buyer).await.unwrap().len(), 2);
        assert_eq!(service.list(&f.s1).await.unwrap().len(), 1);
    }

    /// Adds a line to the stored cart just before the orders are written.
    struct CartChangedBeforeCommit<'a> {
        stores: &'a Stores,
        late: crate::models::CartItem,
    }

    #[async_trait::async_trait]
    impl OrderStore for CartChangedBeforeCommit<'_> {
        async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
            self.stores.orders.get(id).await
        }

        async fn list_for_buyer(
            &self,
            buyer: ekart_core::UserId,
        ) -> Result<Vec<Order>, RepositoryError> {
            self.stores.orders.list_for_buyer(buyer).await
        }

        async fn list_for_seller(
            &self,
            seller: ekart_core::UserId,
        ) -> Result<Vec<Order>, RepositoryError> {
            self.stores.orders.list_for_seller(seller).await
        }

        async fn place_orders(
            &self,
            cart: &crate::models::Cart,
            orders: &[Order],
        ) -> Result<(), RepositoryError> {
            let mut changed = cart.clone();
            changed.add(self.late.clone()).unwrap();
            self.stores.carts.put(&changed).await?;
            self.stores.orders.place_orders(cart, orders).await
        }

        async fn update_status(
            &self,
            id: OrderId,
            status: OrderStatus,
            tracking_number: Option<&str>,
            updated_at: chrono::DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            self.stores
                .orders
                .update_status(id, status, tracking_number, updated_at)
                .await
        }
    }

    #[tokio::test]
    async fn test_item_added_during_checkout_is_kept() {
        let f = two_seller_cart().await;
        let late = stored_product(&f.stores, f.s2.id, "Late", "3.00").await;
        let racing = CartChangedBeforeCommit {
            stores: &f.stores,
            late: crate::models::CartItem::from_product(&late, 1, Utc::now()),
        };
        let service = OrderService::new(f.stores.carts.as_ref(), &racing);

        assert!(matches!(
            service.create(&f.buyer, checkout()).await,
            Err(OrderError::CartChanged)
        ));
        assert!(service.list(&f.buyer).await.unwrap().is_empty());

        let cart = f.stores.carts.get(f.buyer.id).await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 3);
        assert!(cart.item(late.product_id).is_some());
    }

    #[tokio::test]
    async fn test_empty_cart_creates_nothing() {
        let stores = Stores::memory();
        let buyer = stored_user(&stores, "buyer@ekart.dev", UserType::Buyer).await;
        let service = OrderService::new(stores.carts.as_ref(), stores.orders.as_ref());

        assert!(matches!(
            service.create(&buyer, checkout()).await,
            Err(OrderError::EmptyCart)
        ));
        assert!(service.list(&buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_address_rejected_before_anything_happens() {
        let f = two_seller_cart().await;
        let service = OrderService::new(f.stores.carts.as_ref(), f.stores.orders.as_ref());
        let mut bad = checkout();
        bad.shipping_address.postal_code = String::new();

        assert!(matches!(
            service.create(&f.buyer, bad).await,
            Err(OrderError::InvalidAddress("postal_code"))
        ));
        assert!(f.stores.carts.get(f.buyer.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_visibility() {
        let f = two_seller_cart().await;
        let service = OrderService::new(f.stores.carts.as_ref(), f.stores.orders.as_ref());
        let orders = service.create(&f.buyer, checkout()).await.unwrap();
        let s1_order = orders.iter().find(|o| o.seller_id == f.s1.id).unwrap();

        assert!(service.get(&f.buyer, s1_order.order_id).await.is_ok());
        assert!(service.get(&f.s1, s1_order.order_id).await.is_ok());
        assert!(matches!(
            service.get(&f.s2, s1_order.order_id).await,
            Err(OrderError::Forbidden(_))
        ));

        let admin = stored_user(&f.stores, "admin@ekart.dev", UserType::Admin).await;
        assert!(service.get(&admin, s1_order.order_id).await.is_ok());

        assert!(matches!(
            service.get(&f.buyer, OrderId::new()).await,
            Err(OrderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_updates_are_seller_only_and_forward() {
        let f = two_seller_cart().await;
        let service = OrderService::new(f.stores.carts.as_ref(), f.stores.orders.as_ref());
        let orders = service.create(&f.buyer, checkout()).await.unwrap();
        let id = orders.iter().find(|o| o.seller_id == f.s1.id).unwrap().order_id;

        assert!(matches!(
            service.update_status(&f.buyer, id, OrderStatus::Shipped, None).await,
            Err(OrderError::Forbidden(_))
        ));
        assert!(matches!(
            service.update_status(&f.s2, id, OrderStatus::Shipped, None).await,
            Err(OrderError::Forbidden(_))
        ));

        let shipped = service
            .update_status(&f.s1, id, OrderStatus::Shipped, Some("1Z999".to_owned()))
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(shipped.tracking_number.as_deref(), Some("1Z999"));

        assert!(matches!(
            service.update_status(&f.s1, id, OrderStatus::Pending, None).await,
            Err(OrderError::InvalidTransition { .. })
        ));

        let stored = service.get(&f.s1, id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Shipped);
        assert_eq!(stored.tracking_number.as_deref(), Some("1Z999"));
    }

    #[tokio::test]
    async fn test_unknown_order_status_update() {
        let stores = Stores::memory();
        let seller = stored_user(&stores, "s@ekart.dev", UserType::Seller).await;
        let service = OrderService::new(stores.carts.as_ref(), stores.orders.as_ref());

        assert!(matches!(
            service
                .update_status(&seller, OrderId::new(), OrderStatus::Confirmed, None)
                .await,
            Err(OrderError::NotFound(_))
        ));
    }
}
