//! `PostgreSQL` store backend.
//!
//! Tables live in the `ekart` schema (see `crates/api/migrations/`). Queries
//! are built at runtime and decoded through `FromRow` row types, which are
//! converted into domain models with their invariants re-checked.

mod carts;
mod orders;
mod payment_intents;
mod products;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;

use ekart_core::CurrencyCode;

use super::{RepositoryError, StoreHealth};

/// Backend for every store trait over one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

fn column_u32(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column} in database: {value}")))
}

fn column_i32(value: u32, column: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("{column} too large to store: {value}")))
}

fn column_currency(value: &str) -> Result<CurrencyCode, RepositoryError> {
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid currency in database: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_conversions() {
        assert_eq!(column_u32(3, "stock").ok(), Some(3));
        assert!(matches!(
            column_u32(-1, "stock"),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(column_i32(u32::MAX, "quantity").is_err());
        assert_eq!(column_currency("usd").ok(), Some(CurrencyCode::USD));
        assert!(column_currency("???").is_err());
    }
}
