//! # Bookstore: a searchable book catalog with generated summaries
//!
//! This crate implements a small catalog service for book records, providing:
//!
//! - **Catalog storage**: a `CatalogStore` trait with an in-memory engine and a SQLite engine
//!   built on sqlx
//! - **Paginated search**: case-insensitive title/author filtering, ordered by title, split into
//!   fixed-size pages
//! - **Validated writes**: create, update and delete with field validation and detection of
//!   updates racing a concurrent delete
//! - **Summaries**: short descriptions fetched from a text-generation API, with fixed fallback
//!   text whenever the provider is unconfigured or misbehaves
//! - **HTTP API**: axum routes for all of the above
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ HTTP API Layer (Axum routes)                  │
//! ├───────────────────────┬───────────────────────┤
//! │ QueryBuilder          │ MutationGateway       │  SummaryEnricher
//! ├───────────────────────┴───────────────────────┤
//! │ CatalogStore (in-memory or SQLite)            │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage Examples
//!
//! ### Searching the catalog
//!
//! ```rust
//! # use std::sync::Arc;
//! # use bookstore::{Book, CatalogStore, InMemoryCatalogStore, QueryBuilder};
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = Arc::new(InMemoryCatalogStore::new());
//! store.add(&Book::new("The Hobbit", "J.R.R. Tolkien")).await.unwrap();
//! store.add(&Book::new("Emma", "Jane Austen")).await.unwrap();
//!
//! let queries = QueryBuilder::new(store);
//! let page = queries.search(Some("TOLKIEN"), 1, 5).await.unwrap();
//! assert_eq!(page.total_matching, 1);
//! assert_eq!(page.items[0].title, "The Hobbit");
//! # });
//! ```
//!
//! ### Validated writes
//!
//! ```rust
//! # use std::sync::Arc;
//! # use bookstore::{Book, InMemoryCatalogStore, MutationError, MutationGateway};
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let gateway = MutationGateway::new(Arc::new(InMemoryCatalogStore::new()));
//!
//! let dune = gateway.create(Book::new("Dune", "Frank Herbert")).await.unwrap();
//! assert!(dune.id > 0);
//!
//! let err = gateway.create(Book::new("", "Nobody")).await.unwrap_err();
//! assert!(matches!(err, MutationError::Validation(_)));
//! # });
//! ```
//!
//! ### Serving the API
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use bookstore::{AppState, InMemoryCatalogStore, SummaryConfig, SummaryEnricher, create_book_router};
//! # async fn serve() -> Result<(), Box<dyn std::error::Error>> {
//! let summaries = SummaryEnricher::new(SummaryConfig::default())?;
//! let state = AppState::new(Arc::new(InMemoryCatalogStore::new()), summaries, 5);
//! let app = axum::Router::new().nest("/api/v1", create_book_router(state));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
mod book;
mod config;
mod data_store;
mod errors;
mod mutation;
mod query;
mod router;
mod seed;
mod summary;

/// SQLite-backed catalog storage.
///
/// This module provides the SQL statements for book records and `SqlCatalogStore`, which
/// runs each catalog operation in its own transaction.
pub mod sql;

pub use book::{Book, BookId, FieldError};
pub use config::{
    BookstoreConfig, ConfigError, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_PAGE_SIZE,
    DEFAULT_TIMEOUT_SECS, SummaryConfig,
};
pub use data_store::{CatalogStore, InMemoryCatalogStore, SearchCriteria};
pub use errors::{ApiError, MutationError, StoreError};
pub use mutation::MutationGateway;
pub use query::{BookPage, QueryBuilder};
pub use router::{AppState, BookDetails, ListParams, SummaryResponse, create_book_router};
pub use seed::{SeedError, seed_if_empty};
pub use sql::SqlCatalogStore;
pub use summary::{
    NO_SUMMARY, NOT_CONFIGURED, SummaryEnricher, UNRECOGNIZED_MARKER, build_prompt, parse_summary,
};
