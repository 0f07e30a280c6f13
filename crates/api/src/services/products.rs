//! Product catalog service.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use ekart_core::{Money, ProductId};

use super::auth::{self, AuthError};
use crate::db::{ProductStore, RepositoryError};
use crate::models::product::{self, Category, PaginationError};
use crate::models::{
    NewProduct, Page, Pagination, Product, ProductFilter, ProductQuery, ProductUpdate, SortOrder,
    User,
};

/// Maximum length of a product title.
const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("{0}")]
    Validation(String),

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PaginationError> for ProductError {
    fn from(err: PaginationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<AuthError> for ProductError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden(msg) => Self::Forbidden(msg),
            AuthError::Repository(e) => Self::Repository(e),
            _ => Self::Forbidden("not permitted"),
        }
    }
}

/// Catalog operations for one request.
pub struct ProductService<'a> {
    products: &'a dyn ProductStore,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductStore) -> Self {
        Self { products }
    }

    /// Active products matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Validation` for an inverted price range.
    pub async fn list(
        &self,
        filter: ProductFilter,
        pagination: Pagination,
    ) -> Result<Page<Product>, ProductError> {
        validate_filter(&filter)?;
        let query = ProductQuery {
            filter,
            sort: SortOrder::Newest,
            pagination,
            include_inactive: false,
        };
        Ok(self.products.list(&query).await?)
    }

    /// Text search over active products.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Validation` if `text` is blank.
    #[instrument(skip(self, filter, pagination))]
    pub async fn search(
        &self,
        text: &str,
        mut filter: ProductFilter,
        sort: SortOrder,
        pagination: Pagination,
    ) -> Result<Page<Product>, ProductError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProductError::Validation("search query is required".to_owned()));
        }
        filter.text = Some(text.to_owned());
        validate_filter(&filter)?;

        let query = ProductQuery {
            filter,
            sort,
            pagination,
            include_inactive: false,
        };
        Ok(self.products.list(&query).await?)
    }

    /// The seller's own products, inactive ones included.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Forbidden` if `seller` is not a seller.
    pub async fn list_mine(
        &self,
        seller: &User,
        pagination: Pagination,
    ) -> Result<Page<Product>, ProductError> {
        auth::require_seller(seller)?;
        let query = ProductQuery {
            filter: ProductFilter {
                seller_id: Some(seller.id),
                ..Default::default()
            },
            sort: SortOrder::Newest,
            pagination,
            include_inactive: true,
        };
        Ok(self.products.list(&query).await?)
    }

    /// # Errors
    ///
    /// Returns `ProductError::NotFound` if no product has this id.
    pub async fn get(&self, id: ProductId) -> Result<Product, ProductError> {
        self.products
            .get(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// List a new product for `seller`.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Forbidden` if `seller` is not a verified seller.
    /// Returns `ProductError::Validation` for a blank title, unknown category,
    /// a price outside `(0, Money::MAX]`, or negative stock.
    #[instrument(skip(self, seller, new), fields(seller_id = %seller.id))]
    pub async fn create(&self, seller: &User, new: NewProduct) -> Result<Product, ProductError> {
        auth::require_seller(seller)?;

        validate_title(&new.title)?;
        validate_category(&new.category)?;
        validate_price(new.price)?;
        let stock = validate_stock(new.stock_quantity)?;

        let product = Product::create(seller.id, new, stock, Utc::now());
        self.products.create(&product).await?;

        tracing::info!(product_id = %product.product_id, "Product created");
        Ok(product)
    }

    /// Patch a product. Only its seller may.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::NotFound`, then `ProductError::Forbidden` if
    /// `caller` is not the owner, then `ProductError::Validation`.
    #[instrument(skip(self, caller, update), fields(caller_id = %caller.id))]
    pub async fn update(
        &self,
        caller: &User,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ProductError> {
        let mut product = self.get(id).await?;
        if !product.is_owned_by(caller.id) {
            return Err(ProductError::Forbidden("only the product's seller can modify it"));
        }

        if let Some(title) = &update.title {
            validate_title(title)?;
        }
        if let Some(category) = &update.category {
            validate_category(category)?;
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        let stock = update.stock_quantity.map(validate_stock).transpose()?;

        update.apply_to(&mut product, stock, Utc::now());
        self.products.update(&product).await.map_err(|e| match e {
            RepositoryError::NotFound => ProductError::NotFound(id),
            other => ProductError::Repository(other),
        })?;

        tracing::info!("Product updated");
        Ok(product)
    }

    /// Delete a product. Only its seller may.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::NotFound`, then `ProductError::Forbidden` if
    /// `caller` is not the owner.
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn delete(&self, caller: &User, id: ProductId) -> Result<(), ProductError> {
        let product = self.get(id).await?;
        if !product.is_owned_by(caller.id) {
            return Err(ProductError::Forbidden("only the product's seller can delete it"));
        }

        if !self.products.delete(id).await? {
            return Err(ProductError::NotFound(id));
        }
        tracing::info!("Product deleted");
        Ok(())
    }

    /// The fixed category list.
    #[must_use]
    pub const fn categories() -> &'static [Category] {
        product::CATEGORIES
    }
}

fn validate_filter(filter: &ProductFilter) -> Result<(), ProductError> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
        && min > max
    {
        return Err(ProductError::Validation(
            "min_price cannot exceed max_price".to_owned(),
        ));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ProductError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ProductError::Validation("title is required".to_owned()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ProductError::Validation(format!(
            "title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<(), ProductError> {
    product::find_category(category)
        .map(|_| ())
        .ok_or_else(|| ProductError::Validation(format!("unknown category: {category}")))
}

fn validate_price(price: Money) -> Result<(), ProductError> {
    if !price.is_positive() {
        return Err(ProductError::Validation("price must be greater than 0".to_owned()));
    }
    price
        .within_limit()
        .map(|_| ())
        .map_err(|_| ProductError::Validation(format!("price must not exceed {}", Money::MAX)))
}

/// Stock must be non-negative and fit the storage column.
fn validate_stock(stock: i64) -> Result<u32, ProductError> {
    i32::try_from(stock)
        .ok()
        .and_then(|s| u32::try_from(s).ok())
        .ok_or_else(|| {
            ProductError::Validation("stock_quantity must be between 0 and 2147483647".to_owned())
        })
}
