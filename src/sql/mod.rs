//! SQLite database operations for the bookstore.
//!
//! `book` holds the individual statements, each run inside a caller-supplied transaction.
//! `SqlCatalogStore` wraps a connection pool and opens one transaction per store call.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::{Book, BookId, CatalogStore, SearchCriteria, StoreError};

/// Book operations.
pub mod book;

/// A `CatalogStore` backed by SQLite.
#[derive(Clone)]
pub struct SqlCatalogStore {
    pool: SqlitePool,
}

impl SqlCatalogStore {
    /// Connects to `database_url` and brings the schema up to date.
    ///
    /// Accepts `sqlite::memory:` or `sqlite://path/to/file.db`. File databases are created
    /// when missing. An in-memory database lives on a single pinned connection, since every
    /// new connection to `:memory:` would see an empty database.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Wraps an existing pool, running embedded migrations first and filling in search keys
    /// for rows that predate them.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;

        let mut tx = pool.begin().await?;
        let backfilled = book::backfill_search_keys(&mut tx).await?;
        tx.commit().await?;
        if backfilled > 0 {
            tracing::info!(rows = backfilled, "backfilled book search keys");
        }
        Ok(Self { pool })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for SqlCatalogStore {
    async fn find(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let found = book::get(&mut tx, id).await?;
        tx.commit().await?;
        Ok(found)
    }

    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let books = book::list(&mut tx).await?;
        tx.commit().await?;
        Ok(books)
    }

    async fn add(&self, candidate: &Book) -> Result<Book, StoreError> {
        let mut tx = self.pool.begin().await?;
        let stored = book::create(&mut tx, candidate).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn update(&self, replacement: &Book) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = book::update(&mut tx, replacement).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn remove(&self, id: BookId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = book::delete(&mut tx, id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn exists(&self, id: BookId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let exists = book::exists(&mut tx, id).await?;
        tx.commit().await?;
        Ok(exists)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let count = book::count(&mut tx).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn select(&self, criteria: &SearchCriteria) -> Result<(Vec<Book>, usize), StoreError> {
        let mut tx = self.pool.begin().await?;
        let page = book::search(&mut tx, criteria).await?;
        tx.commit().await?;
        Ok(page)
    }
}
