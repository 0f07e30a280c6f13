//! Seed the catalog with demo sellers and products.
//!
//! Reads a YAML file of sellers, each with the products they list:
//!
//! ```yaml
//! sellers:
//!   - email: acme@ekart.dev
//!     password: demo-seller-pass
//!     first_name: Acme
//!     products:
//!       - title: Noise-cancelling headphones
//!         category: electronics
//!         price: 199.99
//!         stock_quantity: 40
//! ```
//!
//! Seeding is idempotent: existing sellers are reused and a product is
//! skipped when its seller already lists one with the same title. With
//! `--clear`, each seller's existing products are deleted first.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use ekart_api::db::{ProductStore, RepositoryError, Stores, UserStore};
use ekart_api::models::{
    NewProduct, NewUser, Pagination, Product, ProductFilter, ProductQuery, User,
};
use ekart_api::services::ProductService;
use ekart_api::services::auth::{AuthError, hash_password};
use ekart_core::{Email, EmailError, UserType};

use super::ConnectError;

/// Largest page the store serves.
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Invalid seller email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0} is registered but is not a seller")]
    NotASeller(Email),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] AuthError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub sellers: Vec<SeedSeller>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSeller {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

impl SeedFile {
    pub fn parse(content: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Problems worth reporting before touching the database.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut emails = HashSet::new();
        for seller in &self.sellers {
            match Email::parse(&seller.email) {
                Ok(email) if !emails.insert(email.clone()) => {
                    errors.push(format!("{email}: listed more than once"));
                }
                Ok(_) => {}
                Err(e) => errors.push(format!("{}: {e}", seller.email)),
            }

            let mut titles = HashSet::new();
            for product in &seller.products {
                if !titles.insert(product.title.trim().to_lowercase()) {
                    errors.push(format!("{}: duplicate product {:?}", seller.email, product.title));
                }
            }
        }
        errors
    }
}

#[derive(Debug, Default)]
pub struct SeedResult {
    pub sellers_created: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub cleared: usize,
    pub errors: Vec<(String, String)>,
}

/// Seed the database from a YAML file.
pub async fn run(file_path: &str, clear_existing: bool) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading seed data");
    let content = tokio::fs::read_to_string(path).await?;
    let seed = SeedFile::parse(&content)?;

    let problems = seed.validate();
    if !problems.is_empty() {
        error!("Seed file validation failed:");
        for problem in &problems {
            error!("  - {problem}");
        }
        return Err(SeedError::Invalid(problems.len()));
    }
    info!(sellers = seed.sellers.len(), "Seed file validated");

    let stores = Stores::postgres(super::connect().await?);
    let result = seed_all(&stores, seed, clear_existing).await?;

    info!("Seeding complete!");
    info!("  Sellers created: {}", result.sellers_created);
    info!("  Products cleared: {}", result.cleared);
    info!("  Products inserted: {}", result.inserted);
    info!("  Products skipped (already exist): {}", result.skipped);
    if !result.errors.is_empty() {
        error!("  Errors: {}", result.errors.len());
        for (product, err) in &result.errors {
            error!("    - {product}: {err}");
        }
    }
    Ok(())
}

/// Seed every seller against any store backend.
pub async fn seed_all(
    stores: &Stores,
    seed: SeedFile,
    clear_existing: bool,
) -> Result<SeedResult, SeedError> {
    let mut result = SeedResult::default();
    let products = ProductService::new(stores.products.as_ref());

    for seller in seed.sellers {
        let (account, created) = find_or_create_seller(stores.users.as_ref(), &seller).await?;
        if created {
            result.sellers_created += 1;
        }

        let mut existing = listed_products(stores.products.as_ref(), &account).await?;
        if clear_existing {
            for product in existing.drain(..) {
                if stores.products.delete(product.product_id).await? {
                    result.cleared += 1;
                }
            }
        }
        let mut titles: HashSet<String> = existing
            .iter()
            .map(|p| p.title.trim().to_lowercase())
            .collect();

        for new in seller.products {
            if !titles.insert(new.title.trim().to_lowercase()) {
                result.skipped += 1;
                continue;
            }
            let title = new.title.clone();
            match products.create(&account, new).await {
                Ok(_) => result.inserted += 1,
                Err(e) => {
                    warn!(title = %title, error = %e, "Product not seeded");
                    result.errors.push((title, e.to_string()));
                }
            }
        }
    }

    Ok(result)
}

async fn find_or_create_seller(
    users: &dyn UserStore,
    seller: &SeedSeller,
) -> Result<(User, bool), SeedError> {
    let email = Email::parse(&seller.email)?;
    if let Some(existing) = users.get_by_email(&email).await? {
        if existing.user_type != UserType::Seller {
            return Err(SeedError::NotASeller(email));
        }
        return Ok((existing, false));
    }

    let user = User::create(
        NewUser {
            email,
            password_hash: hash_password(&seller.password)?,
            first_name: seller.first_name.trim().to_owned(),
            last_name: seller.last_name.trim().to_owned(),
            phone: None,
            user_type: UserType::Seller,
        },
        Utc::now(),
    );
    users.create(&user).await?;
    info!(email = %user.email, "Seller created");
    Ok((user, true))
}

/// Every product `seller` lists, active or not.
async fn listed_products(
    products: &dyn ProductStore,
    seller: &User,
) -> Result<Vec<Product>, SeedError> {
    let mut all = Vec::new();
    for page in 1.. {
        let query = ProductQuery {
            filter: ProductFilter {
                seller_id: Some(seller.id),
                ..ProductFilter::default()
            },
            pagination: Pagination::new(page, PAGE_SIZE).unwrap_or_default(),
            include_inactive: true,
            ..ProductQuery::default()
        };
        let batch = products.list(&query).await?;
        let total = batch.total;
        all.extend(batch.items);
        if all.len() as u64 >= total || page == u32::MAX {
            break;
        }
    }
    Ok(all)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../seed.yaml");

    #[test]
    fn test_sample_file_is_valid() {
        let seed = SeedFile::parse(SAMPLE).unwrap();
        assert!(!seed.sellers.is_empty());
        assert!(seed.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_duplicates() {
        let seed = SeedFile::parse(
            r"
sellers:
  - email: a@ekart.dev
    password: demo-seller-pass
    products:
      - { title: Lamp, category: home, price: 10 }
      - { title: lamp, category: home, price: 12 }
  - email: A@ekart.dev
    password: demo-seller-pass
",
        )
        .unwrap();
        assert_eq!(seed.validate().len(), 2);
    }

    #[tokio::test]
    async fn test_seeding_twice_is_idempotent() {
        let stores = Stores::memory();

        let first = seed_all(&stores, SeedFile::parse(SAMPLE).unwrap(), false)
            .await
            .unwrap();
        assert!(first.sellers_created > 0);
        assert!(first.inserted > 0);
        assert!(first.errors.is_empty());

        let second = seed_all(&stores, SeedFile::parse(SAMPLE).unwrap(), false)
            .await
            .unwrap();
        assert_eq!(second.sellers_created, 0);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, first.inserted);
    }

    #[tokio::test]
    async fn test_clear_replaces_products() {
        let stores = Stores::memory();
        let first = seed_all(&stores, SeedFile::parse(SAMPLE).unwrap(), false)
            .await
            .unwrap();

        let cleared = seed_all(&stores, SeedFile::parse(SAMPLE).unwrap(), true)
            .await
            .unwrap();
        assert_eq!(cleared.cleared, first.inserted);
        assert_eq!(cleared.inserted, first.inserted);
        assert_eq!(cleared.skipped, 0);
    }

    #[tokio::test]
    async fn test_invalid_product_is_reported_not_fatal() {
        let stores = Stores::memory();
        let seed = SeedFile::parse(
            r"
sellers:
  - email: s@ekart.dev
    password: demo-seller-pass
    products:
      - { title: Ghost, category: spaceships, price: 10 }
      - { title: Kite, category: toys, price: 15.5, stock_quantity: 3 }
",
        )
        .unwrap();

        let result = seed_all(&stores, seed, false).await.unwrap();
        assert_eq!(result.inserted, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].0, "Ghost");
    }
}
