//! `ekart.payment_intents`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;

use ekart_core::{Money, PaymentIntentStatus, UserId};

use super::{PgStore, column_currency};
use crate::db::{PaymentIntentStore, RepositoryError};
use crate::models::PaymentIntent;

#[derive(sqlx::FromRow)]
struct PaymentIntentRow {
    id: String,
    client_secret: String,
    user_id: UserId,
    amount: Money,
    currency: String,
    status: PaymentIntentStatus,
    metadata: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentIntentRow> for PaymentIntent {
    type Error = RepositoryError;

    fn try_from(row: PaymentIntentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            currency: column_currency(&row.currency)?,
            id: row.id,
            client_secret: row.client_secret,
            user_id: row.user_id,
            amount: row.amount,
            status: row.status,
            metadata: row.metadata.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PaymentIntentStore for PgStore {
    async fn get(&self, id: &str) -> Result<Option<PaymentIntent>, RepositoryError> {
        let row: Option<PaymentIntentRow> = sqlx::query_as(
            r"
            SELECT id, client_secret, user_id, amount, currency, status, metadata,
                   created_at, updated_at
            FROM ekart.payment_intents
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(PaymentIntent::try_from).transpose()
    }

    async fn put(&self, intent: &PaymentIntent) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO ekart.payment_intents
                (id, client_secret, user_id, amount, currency, status, metadata,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE
            SET amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                status = EXCLUDED.status,
                metadata = EXCLUDED.metadata,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(&intent.id)
        .bind(&intent.client_secret)
        .bind(intent.user_id)
        .bind(intent.amount)
        .bind(intent.currency.code())
        .bind(intent.status)
        .bind(Json(&intent.metadata))
        .bind(intent.created_at)
        .bind(intent.updated_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
