//! `ekart.orders` and `ekart.order_items`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use ekart_core::{
    Money, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

use super::{PgStore, column_currency, column_i32, column_u32, conflict_on_unique};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{Cart, Order, OrderItem, ShippingAddress};

const ORDER_COLUMNS: &str = "id, buyer_id, seller_id, total_amount, currency, status, \
                             payment_status, payment_method, shipping_address, notes, \
                             tracking_number, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    buyer_id: UserId,
    seller_id: UserId,
    total_amount: Money,
    currency: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    shipping_address: Json<ShippingAddress>,
    notes: Option<String>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    unit_price: Money,
    total_price: Money,
    seller_id: UserId,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: column_u32(row.quantity, "quantity")?,
            unit_price: row.unit_price,
            total_price: row.total_price,
            seller_id: row.seller_id,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        Ok(Order {
            order_id: self.id,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            items,
            total_amount: self.total_amount,
            currency: column_currency(&self.currency)?,
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            shipping_address: self.shipping_address.0,
            notes: self.notes,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgStore {
    /// Load the lines for `rows` and assemble full orders, keeping row order.
    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id.as_uuid()).collect();
        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT order_id, product_id, product_name, quantity, unit_price, total_price, seller_id
            FROM ekart.order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items.entry(order_id).or_default().push(row.try_into()?);
        }

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }

    async fn list_where(&self, column: &str, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM ekart.orders WHERE {column} = $1 ORDER BY created_at DESC"
        ))
        .bind(user)
        .fetch_all(self.pool())
        .await?;

        self.with_items(rows).await
    }
}

async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "INSERT INTO ekart.orders ({ORDER_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
    ))
    .bind(order.order_id)
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(order.total_amount)
    .bind(order.currency.code())
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(Json(&order.shipping_address))
    .bind(&order.notes)
    .bind(&order.tracking_number)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| conflict_on_unique(e, "order already exists"))?;

    if order.items.is_empty() {
        return Ok(());
    }

    let quantities = order
        .items
        .iter()
        .map(|item| column_i32(item.quantity, "quantity"))
        .collect::<Result<Vec<_>, _>>()?;

    let mut insert: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO ekart.order_items \
         (order_id, position, product_id, product_name, quantity, unit_price, total_price, seller_id) ",
    );
    insert.push_values(
        order.items.iter().zip(quantities).zip(0_i32..),
        |mut row, ((item, quantity), position)| {
            row.push_bind(order.order_id)
                .push_bind(position)
                .push_bind(item.product_id)
                .push_bind(item.product_name.clone())
                .push_bind(quantity)
                .push_bind(item.unit_price)
                .push_bind(item.total_price)
                .push_bind(item.seller_id);
        },
    );
    insert.build().execute(&mut **tx).await?;

    Ok(())
}

#[async_trait]
impl OrderStore for PgStore {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM ekart.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.with_items(vec![row]).await?.pop())
    }

    async fn list_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.list_where("buyer_id", buyer).await
    }

    async fn list_for_seller(&self, seller: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.list_where("seller_id", seller).await
    }

    async fn place_orders(&self, cart: &Cart, orders: &[Order]) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        // Every cart write bumps updated_at; the row lock holds it still until commit.
        let version: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT updated_at FROM ekart.carts WHERE user_id = $1 FOR UPDATE",
        )
        .bind(cart.user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if version != Some(cart.updated_at) {
            return Err(RepositoryError::Stale(format!(
                "cart of {} changed during checkout",
                cart.user_id
            )));
        }

        for order in orders {
            insert_order(&mut tx, order).await?;
        }

        sqlx::query("DELETE FROM ekart.carts WHERE user_id = $1")
            .bind(cart.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE ekart.orders
            SET status = $2,
                tracking_number = COALESCE($3, tracking_number),
                updated_at = $4
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .bind(tracking_number)
        .bind(updated_at)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
