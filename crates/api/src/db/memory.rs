//! In-memory store backend.
//!
//! All maps sit behind a single `RwLock`, so operations that touch several
//! of them (checkout writes orders and clears the cart) are atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use ekart_core::{Email, OrderId, OrderStatus, ProductId, UserId};

use super::{
    CartStore, OrderStore, PaymentIntentStore, ProductStore, RepositoryError, StoreHealth,
    UserStore,
};
use crate::models::{Cart, Order, Page, PaymentIntent, Product, ProductQuery, User};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    payment_intents: HashMap<String, PaymentIntent>,
}

/// Process-local backend for every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| &u.email == email).cloned())
    }

    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn list(&self, query: &ProductQuery) -> Result<Page<Product>, RepositoryError> {
        Ok(query.run(self.tables.read().await.products.values()))
    }

    async fn create(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.products.contains_key(&product.product_id) {
            return Err(RepositoryError::Conflict("product already exists".to_owned()));
        }
        tables.products.insert(product.product_id, product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .products
            .get_mut(&product.product_id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = product.clone();
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.products.remove(&id).is_some())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.tables.read().await.carts.get(&user_id).cloned())
    }

    async fn put(&self, cart: &Cart) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .carts
            .insert(cart.user_id, cart.clone());
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.tables.write().await.carts.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .orders
                .values()
                .filter(|o| o.buyer_id == buyer)
                .cloned()
                .collect(),
        ))
    }

    async fn list_for_seller(&self, seller: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .orders
                .values()
                .filter(|o| o.seller_id == seller)
                .cloned()
                .collect(),
        ))
    }

    async fn place_orders(&self, cart: &Cart, orders: &[Order]) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.carts.get(&cart.user_id) != Some(cart) {
            return Err(RepositoryError::Stale(format!(
                "cart of {} changed during checkout",
                cart.user_id
            )));
        }
        if let Some(dup) = orders.iter().find(|o| tables.orders.contains_key(&o.order_id)) {
            return Err(RepositoryError::Conflict(format!(
                "order {} already exists",
                dup.order_id
            )));
        }
        for order in orders {
            tables.orders.insert(order.order_id, order.clone());
        }
        tables.carts.remove(&cart.user_id);
        Ok(())
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.status = status;
        if let Some(tracking) = tracking_number {
            order.tracking_number = Some(tracking.to_owned());
        }
        order.updated_at = updated_at;
        Ok(())
    }
}

#[async_trait]
impl PaymentIntentStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<PaymentIntent>, RepositoryError> {
        Ok(self.tables.read().await.payment_intents.get(id).cloned())
    }

    async fn put(&self, intent: &PaymentIntent) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .payment_intents
            .insert(intent.id.clone(), intent.clone());
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use ekart_core::{Money, UserType};

    use super::*;
    use crate::db::Stores;
    use crate::models::order::tests::address;
    use crate::models::{CartItem, Checkout, NewUser};

    fn user(email: &str) -> User {
        User::create(
            NewUser {
                email: Email::parse(email).unwrap(),
                password_hash: "hash".to_owned(),
                first_name: "A".to_owned(),
                last_name: "B".to_owned(),
                phone: None,
                user_type: UserType::Buyer,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let stores = Stores::memory();
        stores.users.create(&user("dup@ekart.dev")).await.unwrap();

        let err = stores.users.create(&user("dup@ekart.dev")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    fn line(name: &str, cents: i64, quantity: u32, seller_id: UserId) -> CartItem {
        CartItem {
            product_id: ProductId::new(),
            product_name: name.to_owned(),
            price: Money::from_minor_units(cents),
            quantity,
            seller_id,
            added_at: Utc::now(),
        }
    }

    fn checkout() -> Checkout {
        Checkout {
            shipping_address: address(),
            payment_method: ekart_core::PaymentMethod::Card,
            notes: None,
        }
    }

    async fn stored_cart(stores: &Stores, buyer: UserId, item: CartItem) -> Cart {
        let mut cart = Cart::empty(buyer, Utc::now());
        cart.add(item).unwrap();
        stores.carts.put(&cart).await.unwrap();
        cart
    }

    #[tokio::test]
    async fn test_place_orders_clears_cart() {
        let stores = Stores::memory();
        let buyer = UserId::new();
        let cart = stored_cart(&stores, buyer, line("Mug", 800, 1, UserId::new())).await;

        let orders = Order::split_cart(&cart, &checkout(), Utc::now()).unwrap();
        stores.orders.place_orders(&cart, &orders).await.unwrap();

        assert!(stores.carts.get(buyer).await.unwrap().is_none());
        assert_eq!(stores.orders.list_for_buyer(buyer).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_place_orders_rejects_duplicates_without_side_effects() {
        let stores = Stores::memory();
        let buyer = UserId::new();
        let cart = stored_cart(&stores, buyer, line("Pen", 150, 2, UserId::new())).await;

        let orders = Order::split_cart(&cart, &checkout(), Utc::now()).unwrap();
        stores.orders.place_orders(&cart, &orders).await.unwrap();
        stores.carts.put(&cart).await.unwrap();

        let err = stores.orders.place_orders(&cart, &orders).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(stores.carts.get(buyer).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cart_changed_after_read_is_not_lost() {
        let stores = Stores::memory();
        let buyer = UserId::new();
        let seller = UserId::new();
        let snapshot = stored_cart(&stores, buyer, line("Pen", 150, 1, seller)).await;
        let orders = Order::split_cart(&snapshot, &checkout(), Utc::now()).unwrap();

        let mut changed = snapshot.clone();
        changed.add(line("Ink", 400, 1, seller)).unwrap();
        stores.carts.put(&changed).await.unwrap();

        let err = stores.orders.place_orders(&snapshot, &orders).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Stale(_)));
        assert_eq!(stores.carts.get(buyer).await.unwrap(), Some(changed));
        assert!(stores.orders.list_for_buyer(buyer).await.unwrap().is_empty());

        stores.carts.delete(buyer).await.unwrap();
        let err = stores.orders.place_orders(&snapshot, &orders).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Stale(_)));
        assert!(stores.orders.list_for_buyer(buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orders_listed_newest_first() {
        let stores = Stores::memory();
        let buyer = UserId::new();
        let seller = UserId::new();
        let cart = stored_cart(&stores, buyer, line("Cup", 100, 1, seller)).await;

        let older =
            Order::split_cart(&cart, &checkout(), Utc::now() - Duration::hours(1)).unwrap();
        stores.orders.place_orders(&cart, &older).await.unwrap();
        stores.carts.put(&cart).await.unwrap();
        let newer = Order::split_cart(&cart, &checkout(), Utc::now()).unwrap();
        stores.orders.place_orders(&cart, &newer).await.unwrap();

        let listed = stores.orders.list_for_seller(seller).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order_id, newer[0].order_id);
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let store = MemoryStore::new();
        let product = crate::services::test_support::sample_product(UserId::new());
        let err = ProductStore::update(&store, &product).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
