//! Order routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use ekart_core::{OrderId, OrderStatus};

use super::extract::{Json, Path};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{Checkout, Order};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show))
        .route("/{id}/status", put(update_status))
}

#[derive(Debug, Serialize)]
pub struct OrdersCreated {
    pub message: &'static str,
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// GET /api/orders
#[instrument(skip_all, fields(user_id = %user.id))]
async fn list(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list(&user).await?))
}

/// POST /api/orders
///
/// Checks out the caller's cart: one order per seller, cart cleared.
#[instrument(skip_all, fields(buyer_id = %user.id))]
async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(checkout): Json<Checkout>,
) -> Result<(StatusCode, Json<OrdersCreated>)> {
    let orders = state.orders().create(&user, checkout).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrdersCreated {
            message: "Orders created successfully",
            orders,
        }),
    ))
}

/// GET /api/orders/{id}
#[instrument(skip_all, fields(%id, user_id = %user.id))]
async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get(&user, id).await?))
}

/// PUT /api/orders/{id}/status
#[instrument(skip_all, fields(%id, seller_id = %user.id))]
async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .update_status(&user, id, update.status, update.tracking_number)
        .await?;
    Ok(Json(order))
}
