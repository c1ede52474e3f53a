//! # Catalog Storage Abstraction
//!
//! This module defines the persistence boundary for book records. Everything above it
//! (query builder, mutation gateway, HTTP handlers) talks to a `CatalogStore` and never
//! to a concrete database.
//!
//! ## Implementations
//!
//! - **InMemoryCatalogStore**: `Mutex<BTreeMap>` keyed by id, for tests and ephemeral runs
//! - **SqlCatalogStore** (`crate::sql`): SQLite through sqlx, one transaction per call
//!
//! ## Usage Examples
//!
//! ```rust
//! use bookstore::{Book, CatalogStore, InMemoryCatalogStore};
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let store = InMemoryCatalogStore::new();
//!     let stored = store.add(&Book::new("Dune", "Frank Herbert")).await.unwrap();
//!     assert_eq!(store.find(stored.id).await.unwrap(), Some(stored));
//! });
//! ```

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Book, BookId, StoreError};

/// Which slice of the matching books a caller wants.
///
/// `needle` is already trimmed and lowercased; `None` selects every book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Lowercased substring to look for in title or author.
    pub needle: Option<String>,
    /// Number of matching books to skip.
    pub offset: usize,
    /// Maximum number of books to return.
    pub limit: usize,
}

/// Trait defining the persistence interface for book records.
///
/// Implementors must be safe to share across request tasks. Every call is self-contained:
/// no transaction or lock survives past the returned future.
///
/// # Error Handling
///
/// Absence is reported through `Option`/`bool` returns, not `StoreError::NotFound`.
/// `StoreError` is reserved for the store itself failing.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Retrieves a book by id.
    ///
    /// # Returns
    /// * `Ok(Some(Book))` - Book found
    /// * `Ok(None)` - No book with this id
    async fn find(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    /// Lists every book, ordered by id.
    async fn list(&self) -> Result<Vec<Book>, StoreError>;

    /// Persists a new book and returns it with its assigned id.
    ///
    /// Whatever id the input carries is ignored.
    async fn add(&self, book: &Book) -> Result<Book, StoreError>;

    /// Replaces the stored fields of `book.id`.
    ///
    /// # Returns
    /// * `Ok(true)` - Book existed and was updated
    /// * `Ok(false)` - No row was affected
    async fn update(&self, book: &Book) -> Result<bool, StoreError>;

    /// Removes a book.
    ///
    /// # Returns
    /// * `Ok(true)` - Book existed and was removed
    /// * `Ok(false)` - Book did not exist
    async fn remove(&self, id: BookId) -> Result<bool, StoreError>;

    /// Reports whether a book with this id exists.
    async fn exists(&self, id: BookId) -> Result<bool, StoreError>;

    /// Counts stored books.
    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.list().await?.len())
    }

    /// Returns one window of the books matching `criteria`, ordered by title then id,
    /// together with the total number of matches.
    ///
    /// The default filters the full listing; engines with a query language override it.
    async fn select(&self, criteria: &SearchCriteria) -> Result<(Vec<Book>, usize), StoreError> {
        let mut matching: Vec<Book> = self
            .list()
            .await?
            .into_iter()
            .filter(|book| match &criteria.needle {
                Some(needle) => book.matches_lowercase(needle),
                None => true,
            })
            .collect();
        matching.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(criteria.offset)
            .take(criteria.limit)
            .collect();
        Ok((page, total))
    }
}

////////////////////////////////////////// InMemoryCatalogStore //////////////////////////////////////////

/// In-memory catalog store.
///
/// Ids start at 1 and increase monotonically; an id is never reused, even after the book
/// holding it is removed.
pub struct InMemoryCatalogStore {
    inner: Mutex<Inner>,
}

struct Inner {
    books: BTreeMap<BookId, Book>,
    next_id: BookId,
}

impl InMemoryCatalogStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                books: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Internal("catalog lock poisoned".to_string()))
    }
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        Ok(self.lock()?.books.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.lock()?.books.values().cloned().collect())
    }

    async fn add(&self, book: &Book) -> Result<Book, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id;
        inner.next_id += 1;

        let mut stored = book.clone();
        stored.id = id;
        inner.books.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, book: &Book) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        match inner.books.get_mut(&book.id) {
            Some(existing) => {
                *existing = book.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: BookId) -> Result<bool, StoreError> {
        Ok(self.lock()?.books.remove(&id).is_some())
    }

    async fn exists(&self, id: BookId) -> Result<bool, StoreError> {
        Ok(self.lock()?.books.contains_key(&id))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.books.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(needle: Option<&str>, offset: usize, limit: usize) -> SearchCriteria {
        SearchCriteria {
            needle: needle.map(str::to_string),
            offset,
            limit,
        }
    }

    #[tokio::test]
    async fn add_assigns_fresh_ids() {
        let store = InMemoryCatalogStore::new();
        let mut candidate = Book::new("Dune", "Frank Herbert");
        candidate.id = 99;

        let first = store.add(&candidate).await.unwrap();
        let second = store.add(&candidate).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_remove() {
        let store = InMemoryCatalogStore::new();
        let first = store.add(&Book::new("A", "a")).await.unwrap();
        assert!(store.remove(first.id).await.unwrap());

        let second = store.add(&Book::new("B", "b")).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn update_of_missing_book_reports_false() {
        let store = InMemoryCatalogStore::new();
        let mut ghost = Book::new("Ghost", "Nobody");
        ghost.id = 42;
        assert!(!store.update(&ghost).await.unwrap());
        assert!(!store.exists(42).await.unwrap());
    }

    #[tokio::test]
    async fn update_replaces_all_fields() {
        let store = InMemoryCatalogStore::new();
        let stored = store
            .add(&Book::new("Dune", "Herbert").with_genre("SciFi"))
            .await
            .unwrap();

        let mut replacement = Book::new("Dune Messiah", "Frank Herbert");
        replacement.id = stored.id;
        assert!(store.update(&replacement).await.unwrap());

        assert_eq!(store.find(stored.id).await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn remove_twice_reports_false_second_time() {
        let store = InMemoryCatalogStore::new();
        let stored = store.add(&Book::new("Emma", "Jane Austen")).await.unwrap();
        assert!(store.remove(stored.id).await.unwrap());
        assert!(!store.remove(stored.id).await.unwrap());
    }

    #[tokio::test]
    async fn select_orders_by_title_then_id() {
        let store = InMemoryCatalogStore::new();
        store.add(&Book::new("Zorba", "Kazantzakis")).await.unwrap();
        let a1 = store.add(&Book::new("Anna", "Tolstoy")).await.unwrap();
        let a2 = store.add(&Book::new("Anna", "Someone Else")).await.unwrap();

        let (page, total) = store.select(&criteria(None, 0, 10)).await.unwrap();
        assert_eq!(total, 3);
        let ids: Vec<BookId> = page.iter().map(|b| b.id).collect();
        assert_eq!(ids[..2], [a1.id, a2.id]);
        assert_eq!(page[2].title, "Zorba");
    }

    #[tokio::test]
    async fn select_counts_matches_independent_of_window() {
        let store = InMemoryCatalogStore::new();
        for i in 0..7 {
            store
                .add(&Book::new(format!("Title {i}"), "Tolkien"))
                .await
                .unwrap();
        }
        store.add(&Book::new("Other", "Austen")).await.unwrap();

        let (page, total) = store
            .select(&criteria(Some("tolkien"), 5, 5))
            .await
            .unwrap();
        assert_eq!(total, 7);
        assert_eq!(page.len(), 2);

        let (page, total) = store
            .select(&criteria(Some("tolkien"), 50, 5))
            .await
            .unwrap();
        assert_eq!(total, 7);
        assert!(page.is_empty());
    }
}
