//! Mock payment routes.
//!
//! Shapes follow a card gateway: amounts go out in minor units on create and
//! confirm, and in major units when an intent is fetched.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use ekart_core::{CurrencyCode, Money, PaymentIntentStatus};

use super::extract::{Json, Path};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::PaymentIntent;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-payment-intent", post(create_intent))
        .route("/confirm-payment", post(confirm))
        .route("/payment-intent/{id}", get(show))
        .route("/config", get(config))
}

#[derive(Debug, Deserialize)]
pub struct CreateIntent {
    /// Charged amount; the cart total when omitted.
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmIntent {
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
pub struct IntentCreated {
    pub client_secret: String,
    pub payment_intent_id: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
}

#[derive(Debug, Serialize)]
pub struct IntentConfirmed {
    pub payment_intent_id: String,
    pub status: PaymentIntentStatus,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct IntentDetails {
    pub payment_intent_id: String,
    pub status: PaymentIntentStatus,
    pub amount: Money,
    pub currency: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct PaymentConfig {
    pub publishable_key: String,
}

/// Gateways spell currencies in lowercase.
fn currency(intent: &PaymentIntent) -> String {
    intent.currency.code().to_ascii_lowercase()
}

fn minor_units(intent: &PaymentIntent) -> Result<i64> {
    intent
        .amount
        .to_minor_units()
        .map_err(|e| AppError::Internal(format!("payment intent {}: {e}", intent.id)))
}

/// POST /api/payments/create-payment-intent
#[instrument(skip_all, fields(user_id = %user.id))]
async fn create_intent(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateIntent>,
) -> Result<Json<IntentCreated>> {
    let intent = state
        .payments()
        .create_intent(
            &user,
            request.amount.map(Money::new),
            request.currency,
            request.metadata,
        )
        .await?;

    Ok(Json(IntentCreated {
        amount: minor_units(&intent)?,
        currency: currency(&intent),
        status: intent.status,
        payment_intent_id: intent.id,
        client_secret: intent.client_secret,
    }))
}

/// POST /api/payments/confirm-payment
#[instrument(skip_all, fields(user_id = %user.id, payment_intent_id = %request.payment_intent_id))]
async fn confirm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ConfirmIntent>,
) -> Result<Json<IntentConfirmed>> {
    let intent = state
        .payments()
        .confirm(&user, &request.payment_intent_id)
        .await?;

    Ok(Json(IntentConfirmed {
        amount: minor_units(&intent)?,
        currency: currency(&intent),
        status: intent.status,
        payment_intent_id: intent.id,
    }))
}

/// GET /api/payments/payment-intent/{id}
#[instrument(skip_all, fields(user_id = %user.id, payment_intent_id = %id))]
async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<IntentDetails>> {
    let intent = state.payments().get(&user, &id).await?;
    Ok(Json(IntentDetails {
        currency: currency(&intent),
        status: intent.status,
        amount: intent.amount,
        payment_intent_id: intent.id,
        metadata: intent.metadata,
    }))
}

/// GET /api/payments/config
async fn config(State(state): State<AppState>) -> Json<PaymentConfig> {
    Json(PaymentConfig {
        publishable_key: state.config().payment_publishable_key.clone(),
    })
}
