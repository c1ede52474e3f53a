//! Book operations for the SQLite database.
//!
//! Each function runs inside a caller-supplied transaction so a request never shares a
//! connection or a partial write with another request.

use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Row, Sqlite, Transaction};

use crate::{Book, BookId, SearchCriteria, StoreError};

/// Result type for database operations.
pub type SqlResult<T> = Result<T, StoreError>;

const COLUMNS: &str = "id, title, author, genre, extra";

fn book_from_row(row: &SqliteRow) -> SqlResult<Book> {
    let Json(extra): Json<Map<String, Value>> = row.try_get("extra")?;
    Ok(Book {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        genre: row.try_get("genre")?,
        extra,
    })
}

/// Inserts a book and returns it with the id SQLite assigned.
///
/// # Examples
/// ```no_run
/// # use bookstore::{Book, sql};
/// # async fn example(pool: sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = pool.begin().await?;
/// let stored = sql::book::create(&mut tx, &Book::new("Dune", "Frank Herbert")).await?;
/// tx.commit().await?;
/// assert!(stored.id > 0);
/// # Ok(())
/// # }
/// ```
pub async fn create(tx: &mut Transaction<'_, Sqlite>, book: &Book) -> SqlResult<Book> {
    let result = sqlx::query(
        r#"
        INSERT INTO books (title, author, genre, extra, title_lower, author_lower)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.genre)
    .bind(Json(&book.extra))
    .bind(search_key(&book.title))
    .bind(search_key(&book.author))
    .execute(&mut **tx)
    .await;

    match result {
        Ok(result) => {
            let mut stored = book.clone();
            stored.id = result.last_insert_rowid();
            Ok(stored)
        }
        Err(e) => {
            tracing::error!(error = %e, "database error creating book");
            Err(e.into())
        }
    }
}

/// Retrieves a book by id.
///
/// # Returns
/// * `Ok(Some(Book))` - Book found
/// * `Ok(None)` - Book not found
pub async fn get(tx: &mut Transaction<'_, Sqlite>, id: BookId) -> SqlResult<Option<Book>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM books WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

    row.as_ref().map(book_from_row).transpose()
}

/// Lists every book ordered by id.
pub async fn list(tx: &mut Transaction<'_, Sqlite>) -> SqlResult<Vec<Book>> {
    let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM books ORDER BY id"))
        .fetch_all(&mut **tx)
        .await?;

    rows.iter().map(book_from_row).collect()
}

/// Overwrites title, author, genre and extra fields of `book.id`.
///
/// # Returns
/// * `Ok(true)` - A row was updated
/// * `Ok(false)` - No row carries this id
pub async fn update(tx: &mut Transaction<'_, Sqlite>, book: &Book) -> SqlResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET title = ?, author = ?, genre = ?, extra = ?, title_lower = ?, author_lower = ?
        WHERE id = ?
        "#,
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.genre)
    .bind(Json(&book.extra))
    .bind(search_key(&book.title))
    .bind(search_key(&book.author))
    .bind(book.id)
    .execute(&mut **tx)
    .await;

    match result {
        Ok(result) => Ok(result.rows_affected() > 0),
        Err(e) => {
            tracing::error!(error = %e, id = book.id, "database error updating book");
            Err(e.into())
        }
    }
}

/// Deletes a book.
///
/// # Returns
/// * `Ok(true)` - Book existed and was deleted
/// * `Ok(false)` - Book did not exist
pub async fn delete(tx: &mut Transaction<'_, Sqlite>, id: BookId) -> SqlResult<bool> {
    let result = sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Reports whether a book with this id exists.
pub async fn exists(tx: &mut Transaction<'_, Sqlite>, id: BookId) -> SqlResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM books WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(found.is_some())
}

/// Counts stored books.
pub async fn count(tx: &mut Transaction<'_, Sqlite>) -> SqlResult<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(&mut **tx)
        .await?;
    Ok(count as usize)
}

/// Returns the requested window of matching books ordered by title then id, plus the
/// number of books matching overall.
///
/// Matches against the stored `title_lower`/`author_lower` keys, so `criteria.needle` must
/// already be lowercased with `str::to_lowercase`.
pub async fn search(
    tx: &mut Transaction<'_, Sqlite>,
    criteria: &SearchCriteria,
) -> SqlResult<(Vec<Book>, usize)> {
    let (total, rows): (i64, Vec<SqliteRow>) = match criteria.needle.as_deref() {
        Some(needle) => {
            let pattern = format!("%{}%", escape_like(needle));
            let filter = r"WHERE title_lower LIKE ?1 ESCAPE '\' OR author_lower LIKE ?1 ESCAPE '\'";
            let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM books {filter}"))
                .bind(&pattern)
                .fetch_one(&mut **tx)
                .await?;
            let rows = sqlx::query(&format!(
                "SELECT {COLUMNS} FROM books {filter} ORDER BY title, id LIMIT ?2 OFFSET ?3"
            ))
            .bind(&pattern)
            .bind(bound(criteria.limit))
            .bind(bound(criteria.offset))
            .fetch_all(&mut **tx)
            .await?;
            (total, rows)
        }
        None => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
                .fetch_one(&mut **tx)
                .await?;
            let rows = sqlx::query(&format!(
                "SELECT {COLUMNS} FROM books ORDER BY title, id LIMIT ?1 OFFSET ?2"
            ))
            .bind(bound(criteria.limit))
            .bind(bound(criteria.offset))
            .fetch_all(&mut **tx)
            .await?;
            (total, rows)
        }
    };

    let books = rows.iter().map(book_from_row).collect::<SqlResult<Vec<_>>>()?;
    Ok((books, total as usize))
}

/// Rewrites the search keys of rows stored before they existed.
///
/// Returns the number of rows updated.
pub async fn backfill_search_keys(tx: &mut Transaction<'_, Sqlite>) -> SqlResult<usize> {
    let rows = sqlx::query(
        "SELECT id, title, author FROM books WHERE title_lower IS NULL OR author_lower IS NULL",
    )
    .fetch_all(&mut **tx)
    .await?;

    for row in &rows {
        let id: BookId = row.try_get("id")?;
        let title: String = row.try_get("title")?;
        let author: String = row.try_get("author")?;
        sqlx::query("UPDATE books SET title_lower = ?, author_lower = ? WHERE id = ?")
            .bind(search_key(&title))
            .bind(search_key(&author))
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(rows.len())
}

/// The lowercased form stored for searching; must agree with `Book::matches_lowercase`.
fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// Converts a window size or offset to an SQLite integer, saturating instead of wrapping.
fn bound(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
