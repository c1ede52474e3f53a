//! Paginated, filtered listing of the catalog.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Book, CatalogStore, SearchCriteria, StoreError};

/// One page of search results plus the paging state a list view needs to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookPage {
    /// The search text as supplied, or `None` when no filter applied.
    pub filter: Option<String>,
    /// The 1-based page these items belong to.
    pub page: u32,
    /// Maximum number of items per page.
    pub page_size: u32,
    /// Number of pages needed to show every match.
    pub total_pages: u32,
    /// Number of books matching the filter across all pages.
    pub total_matching: usize,
    /// Matching books on this page, ordered by title.
    pub items: Vec<Book>,
}

/// Builds filtered, title-ordered pages over a `CatalogStore`.
#[derive(Clone)]
pub struct QueryBuilder {
    store: Arc<dyn CatalogStore>,
}

impl QueryBuilder {
    /// Creates a query builder reading from `store`.
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Returns page `page` of the books whose title or author contains `query`,
    /// ignoring case.
    ///
    /// A blank query matches every book. Page 0 is read as page 1 and a page size of 0 as 1.
    /// Pages past the end come back empty with `total_pages` still filled in.
    pub async fn search(
        &self,
        query: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<BookPage, StoreError> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let filter = query.filter(|q| !q.trim().is_empty());

        let criteria = SearchCriteria {
            needle: filter.map(|q| q.trim().to_lowercase()),
            offset: (page as usize - 1).saturating_mul(page_size as usize),
            limit: page_size as usize,
        };
        let (items, total_matching) = self.store.select(&criteria).await?;

        Ok(BookPage {
            filter: filter.map(str::to_string),
            page,
            page_size,
            total_pages: total_matching.div_ceil(page_size as usize) as u32,
            total_matching,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryCatalogStore;

    async fn seeded(titles_and_authors: &[(&str, &str)]) -> QueryBuilder {
        let store = Arc::new(InMemoryCatalogStore::new());
        for (title, author) in titles_and_authors {
            store.add(&Book::new(*title, *author)).await.unwrap();
        }
        QueryBuilder::new(store)
    }

    #[tokio::test]
    async fn blank_query_applies_no_filter() {
        let builder = seeded(&[("Emma", "Austen"), ("Dune", "Herbert")]).await;
        for query in [None, Some(""), Some("   ")] {
            let page = builder.search(query, 1, 5).await.unwrap();
            assert_eq!(page.total_matching, 2);
            assert_eq!(page.filter, None);
            assert_eq!(page.items[0].title, "Dune");
        }
    }

    #[tokio::test]
    async fn no_match_yields_zero_pages() {
        let builder = seeded(&[("Emma", "Austen")]).await;
        let page = builder.search(Some("zzz"), 1, 5).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.filter.as_deref(), Some("zzz"));
    }

    #[tokio::test]
    async fn genre_is_not_searched() {
        let store = Arc::new(InMemoryCatalogStore::new());
        store
            .add(&Book::new("Dune", "Herbert").with_genre("SciFi"))
            .await
            .unwrap();
        let builder = QueryBuilder::new(store);
        let page = builder.search(Some("scifi"), 1, 5).await.unwrap();
        assert_eq!(page.total_matching, 0);
    }

    #[tokio::test]
    async fn total_pages_rounds_up() {
        let books: Vec<(String, &str)> = (0..11).map(|i| (format!("Book {i:02}"), "Anon")).collect();
        let refs: Vec<(&str, &str)> = books.iter().map(|(t, a)| (t.as_str(), *a)).collect();
        let builder = seeded(&refs).await;

        let last = builder.search(None, 3, 5).await.unwrap();
        assert_eq!(last.total_pages, 3);
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].title, "Book 10");

        let beyond = builder.search(None, 9, 5).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_pages, 3);
    }

    #[tokio::test]
    async fn zero_page_and_page_size_are_clamped() {
        let builder = seeded(&[("A", "x"), ("B", "y")]).await;
        let page = builder.search(None, 0, 0).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 1);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].title, "A");
    }

    #[tokio::test]
    async fn query_is_trimmed_before_matching() {
        let builder = seeded(&[("The Hobbit", "J.R.R. Tolkien")]).await;
        let page = builder.search(Some("  TOLKIEN "), 1, 5).await.unwrap();
        assert_eq!(page.total_matching, 1);
    }
}
