//! Mock payment service.
//!
//! Creates and confirms payment intents without talking to a gateway.

use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::instrument;

use ekart_core::{CurrencyCode, Money, PaymentIntentStatus};

use crate::db::{CartStore, PaymentIntentStore, RepositoryError};
use crate::models::{PaymentIntent, User};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    InvalidAmount(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error("payment intent {0} not found")]
    NotFound(String),

    #[error("forbidden: payment intent belongs to another user")]
    Forbidden,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Payment operations for one request.
pub struct PaymentService<'a> {
    intents: &'a dyn PaymentIntentStore,
    carts: &'a dyn CartStore,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(intents: &'a dyn PaymentIntentStore, carts: &'a dyn CartStore) -> Self {
        Self { intents, carts }
    }

    /// Create an intent for `amount`, or for the cart total when omitted.
    ///
    /// `metadata` is kept as given, plus `user_id` and `user_email`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::EmptyCart` if no amount is given and the cart is empty.
    /// Returns `PaymentError::InvalidAmount` if the amount is not positive or
    /// exceeds `Money::MAX`.
    #[instrument(skip(self, user, metadata), fields(user_id = %user.id))]
    pub async fn create_intent(
        &self,
        user: &User,
        amount: Option<Money>,
        currency: CurrencyCode,
        metadata: Option<Map<String, Value>>,
    ) -> Result<PaymentIntent, PaymentError> {
        let amount = match amount {
            Some(amount) => amount,
            None => {
                let cart = self.carts.get(user.id).await?;
                let total = cart
                    .map(|c| c.total())
                    .transpose()
                    .map_err(|e| PaymentError::InvalidAmount(e.to_string()))?
                    .unwrap_or_default();
                if total == Money::ZERO {
                    return Err(PaymentError::EmptyCart);
                }
                total
            }
        };
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount(
                "amount must be greater than 0".to_owned(),
            ));
        }
        amount
            .within_limit()
            .and_then(|a| a.to_minor_units())
            .map_err(|e| PaymentError::InvalidAmount(e.to_string()))?;

        let mut metadata = metadata.unwrap_or_default();
        metadata.insert("user_id".to_owned(), Value::String(user.id.to_string()));
        metadata.insert(
            "user_email".to_owned(),
            Value::String(user.email.to_string()),
        );

        let intent = PaymentIntent::generate(user.id, amount, currency, metadata, Utc::now());
        self.intents.put(&intent).await?;

        tracing::info!(payment_intent_id = %intent.id, %amount, "Payment intent created");
        Ok(intent)
    }

    /// Mark an intent as succeeded.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound` or `PaymentError::Forbidden`.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn confirm(&self, user: &User, id: &str) -> Result<PaymentIntent, PaymentError> {
        let mut intent = self.get(user, id).await?;
        if intent.status != PaymentIntentStatus::Succeeded {
            intent.status = PaymentIntentStatus::Succeeded;
            intent.updated_at = Utc::now();
            self.intents.put(&intent).await?;
            tracing::info!("Payment confirmed");
        }
        Ok(intent)
    }

    /// Fetch an intent owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound` or `PaymentError::Forbidden`.
    pub async fn get(&self, user: &User, id: &str) -> Result<PaymentIntent, PaymentError> {
        let intent = self
            .intents
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(id.to_owned()))?;
        if !intent.is_owned_by(user.id) {
            return Err(PaymentError::Forbidden);
        }
        Ok(intent)
    }
}
