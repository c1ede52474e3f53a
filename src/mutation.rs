//! Validated create, update and delete against the catalog.
//!
//! Validation and id checks run before any write reaches the store. The one failure that
//! can only be discovered after writing is an update whose target row was deleted by a
//! concurrent request; the gateway tells that case apart from other store failures by
//! asking the store whether the id still exists.

use std::sync::Arc;

use crate::{Book, BookId, CatalogStore, FieldError, MutationError, StoreError};

/// Applies validated writes to a `CatalogStore`.
#[derive(Clone)]
pub struct MutationGateway {
    store: Arc<dyn CatalogStore>,
}

impl MutationGateway {
    /// Creates a gateway writing to `store`.
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Validates and stores a new book, returning it with its assigned id.
    ///
    /// Any id on `candidate` is discarded.
    pub async fn create(&self, mut candidate: Book) -> Result<Book, MutationError> {
        candidate.id = 0;
        candidate.validate().map_err(MutationError::Validation)?;

        let stored = self
            .store
            .add(&candidate)
            .await
            .map_err(|source| conflict(0, source))?;
        tracing::info!(id = stored.id, title = %stored.title, "book created");
        Ok(stored)
    }

    /// Replaces book `id` with `replacement`.
    ///
    /// `replacement.id` must equal `id`. A row deleted between the caller's read and this
    /// write is reported as `NotFound`; any other failed write is a `Conflict`.
    pub async fn update(&self, id: BookId, replacement: Book) -> Result<(), MutationError> {
        if replacement.id != id {
            return Err(MutationError::Validation(vec![FieldError::new(
                "id",
                format!("Id mismatch: path id {} but payload id {}", id, replacement.id),
            )]));
        }
        replacement.validate().map_err(MutationError::Validation)?;

        match self.store.update(&replacement).await {
            Ok(true) => {
                tracing::info!(id, "book updated");
                Ok(())
            }
            Ok(false) => match self.store.exists(id).await {
                Ok(false) => {
                    tracing::warn!(id, "book vanished before update was applied");
                    Err(MutationError::NotFound(id))
                }
                Ok(true) => Err(conflict(
                    id,
                    StoreError::Internal("update affected no rows".to_string()),
                )),
                Err(source) => Err(conflict(id, source)),
            },
            Err(source) => Err(conflict(id, source)),
        }
    }

    /// Deletes book `id`.
    ///
    /// Deleting an id that does not exist is `NotFound`, whether it never existed or was
    /// removed by an earlier call.
    pub async fn delete(&self, id: BookId) -> Result<(), MutationError> {
        if !self.exists(id).await.map_err(|source| conflict(id, source))? {
            return Err(MutationError::NotFound(id));
        }
        match self.store.remove(id).await {
            Ok(true) => {
                tracing::info!(id, "book deleted");
                Ok(())
            }
            Ok(false) => Err(MutationError::NotFound(id)),
            Err(source) => Err(conflict(id, source)),
        }
    }

    /// Reports whether book `id` exists.
    pub async fn exists(&self, id: BookId) -> Result<bool, StoreError> {
        self.store.exists(id).await
    }
}

fn conflict(id: BookId, source: StoreError) -> MutationError {
    tracing::error!(id, error = %source, "catalog write failed");
    MutationError::Conflict { id, source }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::InMemoryCatalogStore;

    /// Wraps an in-memory store and counts the writes that reach it.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryCatalogStore,
        writes: AtomicUsize,
        vanish_on_update: bool,
        fail_updates: bool,
    }

    #[async_trait]
    impl CatalogStore for CountingStore {
        async fn find(&self, id: BookId) -> Result<Option<Book>, StoreError> {
            self.inner.find(id).await
        }

        async fn list(&self) -> Result<Vec<Book>, StoreError> {
            self.inner.list().await
        }

        async fn add(&self, book: &Book) -> Result<Book, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.add(book).await
        }

        async fn update(&self, book: &Book) -> Result<bool, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_updates {
                return Err(StoreError::Database("database is locked".to_string()));
            }
            if self.vanish_on_update {
                // Another request deletes the row just before this write lands.
                self.inner.remove(book.id).await?;
            }
            self.inner.update(book).await
        }

        async fn remove(&self, id: BookId) -> Result<bool, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.remove(id).await
        }

        async fn exists(&self, id: BookId) -> Result<bool, StoreError> {
            self.inner.exists(id).await
        }
    }

    async fn gateway_with(store: CountingStore) -> (MutationGateway, Arc<CountingStore>, Book) {
        let store = Arc::new(store);
        let stored = store.inner.add(&Book::new("Dune", "Herbert")).await.unwrap();
        (MutationGateway::new(store.clone()), store, stored)
    }

    #[tokio::test]
    async fn create_assigns_id_and_round_trips() {
        let store = Arc::new(InMemoryCatalogStore::new());
        let gateway = MutationGateway::new(store.clone());

        let mut candidate = Book::new("Dune", "Herbert").with_genre("SciFi");
        candidate.id = 77;
        let stored = gateway.create(candidate).await.unwrap();

        assert_ne!(stored.id, 77);
        let read = store.find(stored.id).await.unwrap().unwrap();
        assert_eq!(read.title, "Dune");
        assert_eq!(read.author, "Herbert");
        assert_eq!(read.genre.as_deref(), Some("SciFi"));
    }

    #[tokio::test]
    async fn create_rejects_blank_fields_without_writing() {
        let (gateway, store, _) = gateway_with(CountingStore::default()).await;
        let err = gateway.create(Book::new(" ", "")).await.unwrap_err();
        match err {
            MutationError::Validation(fields) => assert_eq!(fields.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_with_mismatched_id_never_touches_store() {
        let (gateway, store, _) = gateway_with(CountingStore::default()).await;
        let mut replacement = Book::new("Dune", "Herbert");
        replacement.id = 2;

        let err = gateway.update(1, replacement).await.unwrap_err();
        match err {
            MutationError::Validation(fields) => assert_eq!(fields[0].field, "id"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_applies_replacement() {
        let (gateway, store, stored) = gateway_with(CountingStore::default()).await;
        let mut replacement = Book::new("Dune Messiah", "Frank Herbert");
        replacement.id = stored.id;

        gateway.update(stored.id, replacement.clone()).await.unwrap();
        assert_eq!(store.find(stored.id).await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn update_of_concurrently_deleted_book_is_not_found() {
        let (gateway, _, stored) = gateway_with(CountingStore {
            vanish_on_update: true,
            ..Default::default()
        })
        .await;

        let err = gateway.update(stored.id, stored.clone()).await.unwrap_err();
        assert!(matches!(err, MutationError::NotFound(id) if id == stored.id));
    }

    #[tokio::test]
    async fn other_update_failures_are_conflicts() {
        let (gateway, _, stored) = gateway_with(CountingStore {
            fail_updates: true,
            ..Default::default()
        })
        .await;

        let err = gateway.update(stored.id, stored.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            MutationError::Conflict {
                source: StoreError::Database(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found_and_leaves_store_unchanged() {
        let (gateway, store, stored) = gateway_with(CountingStore::default()).await;
        let before = store.count().await.unwrap();

        let err = gateway.delete(stored.id + 100).await.unwrap_err();
        assert!(matches!(err, MutationError::NotFound(_)));
        assert_eq!(store.count().await.unwrap(), before);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let (gateway, _, stored) = gateway_with(CountingStore::default()).await;
        gateway.delete(stored.id).await.unwrap();
        assert!(!gateway.exists(stored.id).await.unwrap());
        assert!(matches!(
            gateway.delete(stored.id).await,
            Err(MutationError::NotFound(_))
        ));
    }
}
