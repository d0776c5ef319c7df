//! SQLite persistence for caller identities, endpoint descriptors and the dynamic salt log.
//!
//! The query modules ([`identities`], [`api_info`], [`salts`]) are free functions over a `SqliteConnection`, so they
//! compose into transactions. Two resolver backends sit on top of the same schema:
//! * [`SqlSecretStore`] issues the queries directly and extracts columns by hand.
//! * [`MappedSecretStore`] loads `FromRow` records through repository objects and maps them into domain types.
use std::{env, fmt::Debug};

use log::*;
use sqlx::{migrate, sqlite::SqlitePoolOptions, SqlitePool};

use crate::ResolverError;

pub mod api_info;
pub mod identities;
pub mod mapped;
pub mod salts;
mod sql_store;

pub use mapped::MappedSecretStore;
pub use sql_store::SqlSecretStore;

const SQLITE_DB_URL: &str = "sqlite://data/apisign.db";

pub fn db_url() -> String {
    let result = env::var("APISIGN_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ APISIGN_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, ResolverError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `APISIGN_DATABASE_URL`, or the default.
    pub async fn new(max_connections: u32) -> Result<Self, ResolverError> {
        Self::new_with_url(&db_url(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, ResolverError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), ResolverError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
