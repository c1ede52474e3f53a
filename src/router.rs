//! HTTP endpoints for the catalog.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{FromRequest, OriginalUri, Path, Query, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ApiError, Book, BookId, BookPage, CatalogStore, FieldError, MutationGateway, QueryBuilder,
    SummaryEnricher,
};

///////////////////////////////////////////// AppState /////////////////////////////////////////////

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Read access for single-book lookups.
    pub catalog: Arc<dyn CatalogStore>,
    /// Paginated search.
    pub queries: QueryBuilder,
    /// Validated writes.
    pub mutations: MutationGateway,
    /// Summary generation.
    pub summaries: Arc<SummaryEnricher>,
    /// Books per list page.
    pub page_size: u32,
}

impl AppState {
    /// Wires the query builder and mutation gateway to `catalog`.
    pub fn new(catalog: Arc<dyn CatalogStore>, summaries: SummaryEnricher, page_size: u32) -> Self {
        Self {
            queries: QueryBuilder::new(Arc::clone(&catalog)),
            mutations: MutationGateway::new(Arc::clone(&catalog)),
            catalog,
            summaries: Arc::new(summaries),
            page_size,
        }
    }

    async fn load(&self, id: BookId) -> Result<Book, ApiError> {
        self.catalog.find(id).await?.ok_or(ApiError::NotFound(id))
    }
}

///////////////////////////////////////////// Payloads /////////////////////////////////////////////

/// Query string accepted by `GET /books`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Case-insensitive title/author filter.
    pub search: Option<String>,
    /// 1-based page number; anything below 1 reads as 1.
    pub page: Option<i64>,
}

/// Body of `GET /books/{id}/summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Generated summary or fallback text.
    pub summary: String,
}

/// Body of `GET /books/{id}/details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDetails {
    /// The stored book.
    pub book: Book,
    /// Generated summary or fallback text.
    pub summary: String,
}

/// Extracts a `Book` from a JSON request body.
///
/// Malformed JSON and mistyped fields are rejected as validation errors (400) naming the
/// offending fields, the same shape the mutation gateway uses for blank ones.
struct BookPayload(Book);

#[async_trait]
impl<S> FromRequest<S> for BookPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| body_error(e.body_text()))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| body_error(format!("The request body is not valid JSON: {e}")))?;
        Book::from_json(value)
            .map(BookPayload)
            .map_err(ApiError::Validation)
    }
}

fn body_error(message: impl Into<String>) -> ApiError {
    ApiError::Validation(vec![FieldError::new("body", message)])
}

///////////////////////////////////////////// Handlers /////////////////////////////////////////////

async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<BookPage>, ApiError> {
    let page = params.page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32;
    let page = state
        .queries
        .search(params.search.as_deref(), page, state.page_size)
        .await?;
    Ok(Json(page))
}

async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.load(id).await?))
}

async fn create_book(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    BookPayload(candidate): BookPayload,
) -> Result<Response, ApiError> {
    let stored = state.mutations.create(candidate).await?;
    let location = format!("{}/{}", uri.path().trim_end_matches('/'), stored.id);

    let mut response = (StatusCode::CREATED, Json(stored)).into_response();
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    Ok(response)
}

async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
    BookPayload(replacement): BookPayload,
) -> Result<StatusCode, ApiError> {
    state.mutations.update(id, replacement).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<StatusCode, ApiError> {
    state.mutations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn book_summary(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let book = state.load(id).await?;
    let summary = state.summaries.summarize(&book).await;
    Ok(Json(SummaryResponse { summary }))
}

async fn book_details(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<BookDetails>, ApiError> {
    let book = state.load(id).await?;
    let summary = state.summaries.summarize(&book).await;
    Ok(Json(BookDetails { book, summary }))
}

////////////////////////////////////////////// Router //////////////////////////////////////////////

/// Creates the router for the `/books` endpoints.
///
/// Paths are relative; the daemon nests this under `/api/v1`.
pub fn create_book_router(state: AppState) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/books/:id/details", get(book_details))
        .route("/books/:id/summary", get(book_summary))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use super::*;
    use crate::test_utils::test_helpers::{test_catalog, unconfigured_enricher};

    fn server(catalog: Arc<dyn CatalogStore>) -> TestServer {
        let state = AppState::new(catalog, unconfigured_enricher(), 5);
        TestServer::new(create_book_router(state)).unwrap()
    }

    #[tokio::test]
    async fn create_returns_location() {
        let server = server(test_catalog());
        let response = server
            .post("/books")
            .json(&json!({"title": "Dune", "author": "Herbert", "genre": "SciFi"}))
            .await;
        response.assert_status(StatusCode::CREATED);

        let book: Book = response.json();
        assert_eq!(
            response.header(header::LOCATION),
            format!("/books/{}", book.id)
        );
    }

    #[tokio::test]
    async fn negative_page_is_clamped() {
        let catalog = test_catalog();
        catalog.add(&Book::new("Dune", "Herbert")).await.unwrap();
        let server = server(catalog);

        let page: BookPage = server
            .get("/books")
            .add_query_param("page", -4)
            .await
            .json();
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        let server = server(test_catalog());
        let response = server
            .post("/books")
            .json(&json!({"title": "", "genre": "SciFi"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["status"], 400);
        assert_eq!(error_fields(&body), vec!["title", "author"]);
    }

    fn error_fields(body: &Value) -> Vec<&str> {
        body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn mistyped_create_is_bad_request() {
        let catalog = test_catalog();
        let server = server(catalog.clone());
        let response = server
            .post("/books")
            .json(&json!({"title": 42, "author": "x"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["status"], 400);
        assert_eq!(error_fields(&body), vec!["title"]);
        assert_eq!(catalog.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mistyped_update_is_bad_request() {
        let catalog = test_catalog();
        let stored = catalog.add(&Book::new("Dune", "Herbert")).await.unwrap();
        let server = server(catalog.clone());

        let response = server
            .put(&format!("/books/{}", stored.id))
            .json(&json!({"id": "one", "title": "Dune", "author": "Herbert"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(error_fields(&body), vec!["id"]);
        assert_eq!(catalog.find(stored.id).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn unparseable_body_is_bad_request() {
        let server = server(test_catalog());
        let response = server
            .post("/books")
            .bytes(Bytes::from_static(b"{\"title\": "))
            .content_type("application/json")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(error_fields(&body), vec!["body"]);
    }

    #[tokio::test]
    async fn missing_book_is_not_found_everywhere() {
        let server = server(test_catalog());
        for path in ["/books/9", "/books/9/summary", "/books/9/details"] {
            server.get(path).await.assert_status(StatusCode::NOT_FOUND);
        }
        server
            .delete("/books/9")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn details_attach_summary() {
        let catalog = test_catalog();
        let stored = catalog.add(&Book::new("Dune", "Herbert")).await.unwrap();
        let server = server(catalog);

        let details: BookDetails = server.get(&format!("/books/{}/details", stored.id)).await.json();
        assert_eq!(details.book, stored);
        assert_eq!(details.summary, "AI summary is not configured.");
    }
}
