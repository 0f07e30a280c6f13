//! Cart routes. Every route acts on the caller's own cart.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use ekart_core::ProductId;

use super::extract::{Json, Path, Query};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{Cart, CartSummary};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(show).delete(clear))
        .route("/items", post(add_item))
        .route("/items/{product_id}", put(update_item).delete(remove_item))
}

/// Stored carts stay within their limits, so a total that cannot be
/// computed means the stored data is bad.
fn summary(cart: Cart) -> Result<Json<CartSummary>> {
    let user_id = cart.user_id;
    CartSummary::try_from(cart)
        .map(Json)
        .map_err(|e| AppError::Internal(format!("cart of {user_id}: {e}")))
}

const fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuantityParam {
    pub quantity: Option<i64>,
}

/// GET /api/cart
#[instrument(skip_all, fields(user_id = %user.id))]
async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CartSummary>> {
    let cart = state.cart().get(user.id).await?;
    summary(cart)
}

/// DELETE /api/cart
#[instrument(skip_all, fields(user_id = %user.id))]
async fn clear(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Value>> {
    state.cart().clear(user.id).await?;
    Ok(Json(json!({ "message": "Cart cleared" })))
}

/// POST /api/cart/items
#[instrument(skip_all, fields(user_id = %user.id))]
async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(item): Json<AddItem>,
) -> Result<Json<CartSummary>> {
    let cart = state
        .cart()
        .add_item(user.id, item.product_id, item.quantity)
        .await?;
    summary(cart)
}

/// PUT /api/cart/items/{product_id}
///
/// The quantity comes from a `{"quantity": n}` body or a `?quantity=n`
/// query parameter; the body wins when both are present.
#[instrument(skip_all, fields(user_id = %user.id, %product_id))]
async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<ProductId>,
    Query(param): Query<QuantityParam>,
    body: Bytes,
) -> Result<Json<CartSummary>> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<QuantityParam>(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))?
            .quantity
    };
    let quantity = from_body
        .or(param.quantity)
        .ok_or_else(|| AppError::BadRequest("quantity is required".to_owned()))?;

    let cart = state
        .cart()
        .update_quantity(user.id, product_id, quantity)
        .await?;
    summary(cart)
}

/// DELETE /api/cart/items/{product_id}
#[instrument(skip_all, fields(user_id = %user.id, %product_id))]
async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartSummary>> {
    let cart = state.cart().remove_item(user.id, product_id).await?;
    summary(cart)
}
