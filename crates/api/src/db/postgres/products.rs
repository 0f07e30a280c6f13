//! `ekart.products`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

use ekart_core::{Money, ProductId, UserId};

use super::{PgStore, column_currency, column_i32, column_u32, conflict_on_unique};
use crate::db::{ProductStore, RepositoryError};
use crate::models::{Page, Product, ProductImage, ProductQuery, ProductVariant, SortOrder};

const PRODUCT_COLUMNS: &str = "id, seller_id, title, description, category, price, currency, \
                               stock_quantity, images, variants, tags, brand, is_active, rating, \
                               review_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    seller_id: UserId,
    title: String,
    description: String,
    category: String,
    price: Money,
    currency: String,
    stock_quantity: i32,
    images: Json<Vec<ProductImage>>,
    variants: Json<Vec<ProductVariant>>,
    tags: Vec<String>,
    brand: Option<String>,
    is_active: bool,
    rating: Option<Decimal>,
    review_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.id,
            seller_id: row.seller_id,
            title: row.title,
            description: row.description,
            category: row.category,
            price: row.price,
            currency: column_currency(&row.currency)?,
            stock_quantity: column_u32(row.stock_quantity, "stock_quantity")?,
            images: row.images.0,
            variants: row.variants.0,
            tags: row.tags,
            brand: row.brand,
            is_active: row.is_active,
            rating: row.rating,
            review_count: column_u32(row.review_count, "review_count")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Escape `%`, `_`, and `\` for use inside an `ILIKE` pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append the `WHERE` conditions for `query` (the builder already holds
/// `WHERE TRUE`).
fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    let filter = &query.filter;

    if !query.include_inactive {
        builder.push(" AND is_active");
    }
    if let Some(category) = &filter.category {
        builder
            .push(" AND lower(category) = lower(")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(seller_id) = filter.seller_id {
        builder.push(" AND seller_id = ").push_bind(seller_id);
    }
    if let Some(min) = filter.min_price {
        builder.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND price <= ").push_bind(max);
    }
    if let Some(brand) = &filter.brand {
        builder
            .push(" AND lower(brand) = lower(")
            .push_bind(brand.clone())
            .push(")");
    }
    if filter.in_stock {
        builder.push(" AND stock_quantity > 0");
    }
    if let Some(text) = &filter.text {
        let pattern = format!("%{}%", escape_like(text));
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

const fn order_by(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Relevance | SortOrder::Newest => " ORDER BY created_at DESC, id",
        SortOrder::PriceAsc => " ORDER BY price ASC, created_at DESC, id",
        SortOrder::PriceDesc => " ORDER BY price DESC, created_at DESC, id",
        SortOrder::Rating => " ORDER BY rating DESC NULLS LAST, created_at DESC, id",
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM ekart.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn list(&self, query: &ProductQuery) -> Result<Page<Product>, RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM ekart.products WHERE TRUE");
        push_conditions(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool()).await?;

        let pagination = query.pagination;
        let mut select = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM ekart.products WHERE TRUE"
        ));
        push_conditions(&mut select, query);
        select
            .push(order_by(query.sort))
            .push(" LIMIT ")
            .push_bind(i64::from(pagination.per_page()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX));

        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(self.pool()).await?;
        let items = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page: pagination.page(),
            per_page: pagination.per_page(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn create(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO ekart.products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        ))
        .bind(product.product_id)
        .bind(product.seller_id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.currency.code())
        .bind(column_i32(product.stock_quantity, "stock_quantity")?)
        .bind(Json(&product.images))
        .bind(Json(&product.variants))
        .bind(&product.tags)
        .bind(&product.brand)
        .bind(product.is_active)
        .bind(product.rating)
        .bind(column_i32(product.review_count, "review_count")?)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "product already exists"))?;

        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE ekart.products
            SET title = $2, description = $3, category = $4, price = $5, currency = $6,
                stock_quantity = $7, images = $8, variants = $9, tags = $10, brand = $11,
                is_active = $12, rating = $13, review_count = $14, updated_at = $15
            WHERE id = $1
            ",
        )
        .bind(product.product_id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.currency.code())
        .bind(column_i32(product.stock_quantity, "stock_quantity")?)
        .bind(Json(&product.images))
        .bind(Json(&product.variants))
        .bind(&product.tags)
        .bind(&product.brand)
        .bind(product.is_active)
        .bind(product.rating)
        .bind(column_i32(product.review_count, "review_count")?)
        .bind(product.updated_at)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM ekart.products WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
