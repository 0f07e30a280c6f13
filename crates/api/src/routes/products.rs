//! Catalog routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use ekart_core::{Money, ProductId, UserId};

use super::extract::{Json, Path, Query};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{
    NewProduct, Page, Pagination, Product, ProductFilter, ProductUpdate, SortOrder,
    product::{Category, DEFAULT_PER_PAGE},
};
use crate::services::{ProductError, ProductService};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/categories", get(categories))
        .route("/mine", get(mine))
        .route("/{id}", get(show).put(update).delete(destroy))
}

/// Query parameters shared by listing and search.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub seller_id: Option<UserId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub brand: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub sort_by: SortOrder,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl CatalogParams {
    fn pagination(&self) -> std::result::Result<Pagination, ProductError> {
        Ok(Pagination::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )?)
    }

    fn filter(&self) -> ProductFilter {
        ProductFilter {
            category: self.category.clone(),
            seller_id: self.seller_id,
            min_price: self.min_price.map(Money::new),
            max_price: self.max_price.map(Money::new),
            brand: self.brand.clone(),
            in_stock: self.in_stock,
            text: self
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_owned),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /api/products
#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<Page<Product>>> {
    let page = state
        .products()
        .list(params.filter(), params.pagination()?)
        .await?;
    Ok(Json(page))
}

/// GET /api/products/search
#[instrument(skip_all)]
async fn search(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<Page<Product>>> {
    let text = params.q.clone().unwrap_or_default();
    let page = state
        .products()
        .search(&text, params.filter(), params.sort_by, params.pagination()?)
        .await?;
    Ok(Json(page))
}

/// GET /api/products/categories
async fn categories() -> Json<&'static [Category]> {
    Json(ProductService::categories())
}

/// GET /api/products/mine
#[instrument(skip_all, fields(seller_id = %user.id))]
async fn mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Product>>> {
    let pagination = Pagination::new(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )
    .map_err(ProductError::from)?;
    Ok(Json(state.products().list_mine(&user, pagination).await?))
}

/// GET /api/products/{id}
#[instrument(skip_all, fields(%id))]
async fn show(State(state): State<AppState>, Path(id): Path<ProductId>) -> Result<Json<Product>> {
    Ok(Json(state.products().get(id).await?))
}

/// POST /api/products
#[instrument(skip_all, fields(seller_id = %user.id))]
async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.products().create(&user, new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}
#[instrument(skip_all, fields(%id, user_id = %user.id))]
async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    Ok(Json(state.products().update(&user, id, patch).await?))
}

/// DELETE /api/products/{id}
#[instrument(skip_all, fields(%id, user_id = %user.id))]
async fn destroy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    state.products().delete(&user, id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
