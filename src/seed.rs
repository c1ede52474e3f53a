//! One-time catalog seeding from a JSON file.

use std::path::{Path, PathBuf};

use crate::{Book, CatalogStore, StoreError};

/// Errors raised while seeding the catalog.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The seed file exists but could not be read.
    #[error("failed to read seed file {path}: {source}")]
    Io {
        /// The seed file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The seed file is not a JSON array of books.
    #[error("failed to parse seed file {path}: {source}")]
    Parse {
        /// The seed file.
        path: PathBuf,
        /// Parser failure.
        source: serde_json::Error,
    },
    /// A seeded book failed validation.
    #[error("seed entry {index} is invalid: {message}")]
    Invalid {
        /// Position of the entry in the array.
        index: usize,
        /// The validation failures, joined.
        message: String,
    },
    /// The store rejected a read or an insert.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Loads books from `path` into `store` if, and only if, the store is empty.
///
/// Returns the number of books inserted. A missing file inserts nothing. Ids in the file
/// are ignored; the store assigns fresh ones in file order.
pub async fn seed_if_empty(store: &dyn CatalogStore, path: &Path) -> Result<usize, SeedError> {
    if store.count().await? > 0 {
        tracing::debug!(path = %path.display(), "catalog already populated; skipping seed");
        return Ok(0);
    }

    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "seed file not found; starting with an empty catalog");
            return Ok(0);
        }
        Err(source) => {
            return Err(SeedError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let books: Vec<Book> = serde_json::from_str(&contents).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    // Validate everything before the first insert so a bad file leaves the store empty.
    for (index, book) in books.iter().enumerate() {
        book.validate().map_err(|fields| SeedError::Invalid {
            index,
            message: fields
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        })?;
    }

    for mut book in books.iter().cloned() {
        book.id = 0;
        store.add(&book).await?;
    }
    tracing::info!(path = %path.display(), count = books.len(), "seeded catalog");
    Ok(books.len())
}
