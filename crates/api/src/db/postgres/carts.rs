//! `ekart.carts` and `ekart.cart_items`.
//!
//! A cart is written as a whole document: the header row is upserted and its
//! lines replaced in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use ekart_core::{Money, ProductId, UserId};

use super::{PgStore, column_i32, column_u32};
use crate::db::{CartStore, RepositoryError};
use crate::models::{Cart, CartItem};

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: ProductId,
    product_name: String,
    price: Money,
    quantity: i32,
    seller_id: UserId,
    added_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            product_name: row.product_name,
            price: row.price,
            quantity: column_u32(row.quantity, "quantity")?,
            seller_id: row.seller_id,
            added_at: row.added_at,
        })
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let updated_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT updated_at FROM ekart.carts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool())
                .await?;

        let Some(updated_at) = updated_at else {
            return Ok(None);
        };

        let rows: Vec<CartItemRow> = sqlx::query_as(
            r"
            SELECT product_id, product_name, price, quantity, seller_id, added_at
            FROM ekart.cart_items
            WHERE user_id = $1
            ORDER BY position
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let items = rows
            .into_iter()
            .map(CartItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart {
            user_id,
            items,
            updated_at,
        }))
    }

    async fn put(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let quantities = cart
            .items
            .iter()
            .map(|item| column_i32(item.quantity, "quantity"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO ekart.carts (user_id, updated_at)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(cart.user_id)
        .bind(cart.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM ekart.cart_items WHERE user_id = $1")
            .bind(cart.user_id)
            .execute(&mut *tx)
            .await?;

        if !cart.items.is_empty() {
            let mut insert: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO ekart.cart_items \
                 (user_id, position, product_id, product_name, price, quantity, seller_id, added_at) ",
            );
            insert.push_values(
                cart.items.iter().zip(quantities).zip(0_i32..),
                |mut row, ((item, quantity), position)| {
                    row.push_bind(cart.user_id)
                        .push_bind(position)
                        .push_bind(item.product_id)
                        .push_bind(item.product_name.clone())
                        .push_bind(item.price)
                        .push_bind(quantity)
                        .push_bind(item.seller_id)
                        .push_bind(item.added_at);
                },
            );
            insert.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM ekart.carts WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
