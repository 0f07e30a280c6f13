//! Product catalog types and in-process catalog filtering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ekart_core::{CurrencyCode, Money, ProductId, UserId};

/// Largest page a listing will return.
pub const MAX_PER_PAGE: u32 = 100;

/// Page size used when the client does not ask for one.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// A catalog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub slug: &'static str,
}

/// The fixed category list.
pub const CATEGORIES: &[Category] = &[
    Category { id: "electronics", name: "Electronics", slug: "electronics" },
    Category { id: "fashion", name: "Fashion", slug: "fashion" },
    Category { id: "home", name: "Home & Garden", slug: "home" },
    Category { id: "sports", name: "Sports", slug: "sports" },
    Category { id: "books", name: "Books", slug: "books" },
    Category { id: "toys", name: "Toys", slug: "toys" },
];

/// Look up a category by id or slug, case-insensitively.
#[must_use]
pub fn find_category(name: &str) -> Option<&'static Category> {
    CATEGORIES
        .iter()
        .find(|c| c.id.eq_ignore_ascii_case(name) || c.slug.eq_ignore_ascii_case(name))
}

/// A product listed by a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    /// The owning seller; only they may mutate the product.
    pub seller_id: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Money,
    pub currency: CurrencyCode,
    pub stock_quantity: u32,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub brand: Option<String>,
    pub is_active: bool,
    /// Average review score (0-5).
    pub rating: Option<Decimal>,
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a new, active product owned by `seller_id`.
    #[must_use]
    pub fn create(seller_id: UserId, new: NewProduct, stock_quantity: u32, now: DateTime<Utc>) -> Self {
        Self {
            product_id: ProductId::new(),
            seller_id,
            title: new.title.trim().to_owned(),
            description: new.description,
            category: new.category.to_ascii_lowercase(),
            price: new.price,
            currency: new.currency,
            stock_quantity,
            images: new.images,
            variants: new.variants,
            tags: new.tags,
            brand: new.brand,
            is_active: true,
            rating: None,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether at least one unit can be bought.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Whether `user` owns this product.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.seller_id == user
    }

    /// Case-insensitive match of `needle` (already lowercased) against the
    /// title, description, and tags.
    fn mentions(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub name: String,
    pub value: String,
    /// Added to the base price when this variant is picked.
    #[serde(default)]
    pub price_modifier: Money,
    #[serde(default)]
    pub stock_quantity: u32,
}

/// Product creation input, as sent by a seller.
///
/// `stock_quantity` is signed so a negative value reaches validation instead
/// of failing deserialization with a less helpful message.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Money,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

/// Partial product update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Money>,
    pub stock_quantity: Option<i64>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub brand: Option<String>,
    pub images: Option<Vec<ProductImage>>,
    pub variants: Option<Vec<ProductVariant>>,
}

impl ProductUpdate {
    /// Apply the patch. `stock_quantity` must already be range-checked.
    pub fn apply_to(self, product: &mut Product, stock_quantity: Option<u32>, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            product.title = title.trim().to_owned();
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(category) = self.category {
            product.category = category.to_ascii_lowercase();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = stock_quantity {
            product.stock_quantity = stock;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        if let Some(tags) = self.tags {
            product.tags = tags;
        }
        if let Some(brand) = self.brand {
            product.brand = Some(brand);
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(variants) = self.variants {
            product.variants = variants;
        }
        product.updated_at = now;
    }
}

/// Attribute filters shared by listing and search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub seller_id: Option<UserId>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub brand: Option<String>,
    /// Only products with stock on hand.
    pub in_stock: bool,
    /// Free-text query over title, description, and tags.
    pub text: Option<String>,
}

impl ProductFilter {
    /// Whether `product` satisfies every set filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && !product.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if self.seller_id.is_some_and(|s| s != product.seller_id) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if let Some(brand) = &self.brand
            && !product
                .brand
                .as_deref()
                .is_some_and(|b| b.eq_ignore_ascii_case(brand))
        {
            return false;
        }
        if self.in_stock && !product.in_stock() {
            return false;
        }
        if let Some(text) = &self.text
            && !product.mentions(&text.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// Result ordering for listings and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Newest first; there is no scoring model behind it.
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    /// Highest rated first, unrated last.
    Rating,
    Newest,
}

impl SortOrder {
    /// Compare two products under this ordering. Ties fall back to newest first.
    #[must_use]
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        let newest = b.created_at.cmp(&a.created_at);
        match self {
            Self::Relevance | Self::Newest => newest,
            Self::PriceAsc => a.price.cmp(&b.price).then(newest),
            Self::PriceDesc => b.price.cmp(&a.price).then(newest),
            // `None < Some`, so reversing puts unrated products last.
            Self::Rating => b.rating.cmp(&a.rating).then(newest),
        }
    }
}

/// Error for out-of-range paging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("page must be at least 1")]
    Page,
    #[error("per_page must be between 1 and 100")]
    PerPage,
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    per_page: u32,
}

impl Pagination {
    /// Validate paging parameters (`page >= 1`, `1 <= per_page <= 100`).
    ///
    /// # Errors
    ///
    /// Returns a [`PaginationError`] naming the offending parameter.
    pub const fn new(page: u32, per_page: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::Page);
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(PaginationError::PerPage);
        }
        Ok(Self { page, per_page })
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

/// A complete catalog query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: SortOrder,
    pub pagination: Pagination,
    /// Include deactivated products (seller's own listing).
    pub include_inactive: bool,
}

impl ProductQuery {
    /// Whether `product` belongs in the result set, ignoring paging.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        (self.include_inactive || product.is_active) && self.filter.matches(product)
    }

    /// Filter, sort, and page an in-memory catalog.
    #[must_use]
    pub fn run<'a>(&self, products: impl IntoIterator<Item = &'a Product>) -> Page<Product> {
        let mut matched: Vec<&Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        matched.sort_by(|a, b| self.sort.compare(a, b));

        let total = matched.len() as u64;
        let skip = usize::try_from(self.pagination.offset()).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(skip)
            .take(self.pagination.per_page() as usize)
            .cloned()
            .collect();

        Page {
            items,
            page: self.pagination.page(),
            per_page: self.pagination.per_page(),
            total,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn money(s: &str) -> Money {
        Money::new(s.parse().unwrap())
    }

    fn product(title: &str, price: &str, age_days: i64) -> Product {
        let now = Utc::now() - Duration::days(age_days);
        Product::create(
            UserId::new(),
            NewProduct {
                title: title.to_owned(),
                description: format!("{title} description"),
                category: "electronics".to_owned(),
                price: money(price),
                currency: CurrencyCode::USD,
                stock_quantity: 0,
                images: vec![],
                variants: vec![],
                tags: vec!["gadget".to_owned()],
                brand: Some("Acme".to_owned()),
            },
            5,
            now,
        )
    }

    #[test]
    fn test_find_category() {
        assert_eq!(find_category("Books").unwrap().name, "Books");
        assert!(find_category("groceries").is_none());
        assert_eq!(CATEGORIES.len(), 6);
    }

    #[test]
    fn test_filter_price_range_inclusive() {
        let p = product("Headphones", "49.99", 0);
        let filter = ProductFilter {
            min_price: Some(money("49.99")),
            max_price: Some(money("50.00")),
            ..Default::default()
        };
        assert!(filter.matches(&p));

        let filter = ProductFilter {
            max_price: Some(money("49.98")),
            ..Default::default()
        };
        assert!(!filter.matches(&p));
    }

    #[test]
    fn test_filter_text_matches_title_description_and_tags() {
        let p = product("Noise Cancelling Headphones", "99.00", 0);
        for text in ["noise", "DESCRIPTION", "gadg"] {
            let filter = ProductFilter {
                text: Some(text.to_owned()),
                ..Default::default()
            };
            assert!(filter.matches(&p), "{text} should match");
        }
        let filter = ProductFilter {
            text: Some("blender".to_owned()),
            ..Default::default()
        };
        assert!(!filter.matches(&p));
    }

    #[test]
    fn test_filter_in_stock_and_brand() {
        let mut p = product("Lamp", "10.00", 0);
        p.stock_quantity = 0;
        let in_stock = ProductFilter {
            in_stock: true,
            ..Default::default()
        };
        assert!(!in_stock.matches(&p));
        assert!(ProductFilter::default().matches(&p));

        let brand = ProductFilter {
            brand: Some("acme".to_owned()),
            ..Default::default()
        };
        assert!(brand.matches(&p));
    }

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(Pagination::new(0, 20), Err(PaginationError::Page));
        assert_eq!(Pagination::new(1, 0), Err(PaginationError::PerPage));
        assert_eq!(Pagination::new(1, 101), Err(PaginationError::PerPage));
        assert_eq!(Pagination::new(3, 10).unwrap().offset(), 20);
    }

    #[test]
    fn test_query_sorts_and_pages() {
        let catalog = vec![
            product("Old", "30.00", 3),
            product("Mid", "10.00", 2),
            product("New", "20.00", 1),
        ];

        let query = ProductQuery::default();
        let page = query.run(&catalog);
        let titles: Vec<_> = page.items.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["New", "Mid", "Old"]);
        assert_eq!(page.total, 3);

        let query = ProductQuery {
            sort: SortOrder::PriceAsc,
            pagination: Pagination::new(2, 2).unwrap(),
            ..Default::default()
        };
        let page = query.run(&catalog);
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Old");
    }

    #[test]
    fn test_query_hides_inactive_unless_asked() {
        let mut hidden = product("Hidden", "5.00", 0);
        hidden.is_active = false;
        let catalog = [hidden];

        assert_eq!(ProductQuery::default().run(&catalog).total, 0);

        let query = ProductQuery {
            include_inactive: true,
            ..Default::default()
        };
        assert_eq!(query.run(&catalog).total, 1);
    }

    #[test]
    fn test_rating_sort_puts_unrated_last() {
        let mut rated = product("Rated", "5.00", 5);
        rated.rating = Some(Decimal::new(45, 1));
        let unrated = product("Unrated", "5.00", 0);

        let page = ProductQuery {
            sort: SortOrder::Rating,
            ..Default::default()
        }
        .run(&[unrated, rated]);
        assert_eq!(page.items[0].title, "Rated");
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut p = product("Desk", "120.00", 0);
        let before = p.clone();
        ProductUpdate {
            price: Some(money("99.50")),
            ..Default::default()
        }
        .apply_to(&mut p, None, Utc::now());

        assert_eq!(p.price, money("99.50"));
        assert_eq!(p.title, before.title);
        assert_eq!(p.stock_quantity, before.stock_quantity);
    }
}
