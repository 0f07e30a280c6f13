//! Mock payment intents.
//!
//! Intents mimic a card gateway's shape (`pi_…` ids, client secrets, amounts
//! in cents) but nothing is ever charged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use ekart_core::{CurrencyCode, Money, PaymentIntentStatus, UserId};

/// A payment intent owned by the user who created it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(skip)]
    pub client_secret: String,
    pub user_id: UserId,
    pub amount: Money,
    pub currency: CurrencyCode,
    pub status: PaymentIntentStatus,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntent {
    /// Mint a new intent awaiting confirmation.
    #[must_use]
    pub fn generate(
        user_id: UserId,
        amount: Money,
        currency: CurrencyCode,
        metadata: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Self {
        let id = format!("pi_{}", hex::encode(rand::random::<[u8; 12]>()));
        let client_secret = format!("{id}_secret_{}", hex::encode(rand::random::<[u8; 8]>()));
        Self {
            id,
            client_secret,
            user_id,
            amount,
            currency,
            status: PaymentIntentStatus::RequiresPaymentMethod,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user` created this intent.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == user
    }
}
