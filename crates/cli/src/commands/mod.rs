//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use ekart_api::db;

/// Failure to reach the database named by the environment.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Missing environment variable: EKART_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using `EKART_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("EKART_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}
