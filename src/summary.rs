//! Generated book summaries.
//!
//! `SummaryEnricher::summarize` always yields displayable text. A missing API key yields a
//! fixed notice without touching the network. A failed provider call yields the provider's
//! own error text, so the failure is visible on the page instead of being hidden behind a
//! generic message.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Book, SummaryConfig};

/// Returned when no API key is configured.
pub const NOT_CONFIGURED: &str = "AI summary is not configured.";
/// Returned when the provider answered but produced no text.
pub const NO_SUMMARY: &str = "No summary generated.";
/// First line the provider must use when it does not recognize the book.
pub const UNRECOGNIZED_MARKER: &str =
    "Online information not found. Based on the title and author, here is a reasonable guess:";

/// Builds the single-turn prompt sent to the provider for `book`.
pub fn build_prompt(book: &Book) -> String {
    format!(
        r#"You are generating a short professional book description.

First, try to use your known public knowledge about this book
using the given title and author.

If you can confidently recognize this book (by title and author),
write a short factual description.

If you cannot confidently find known information about this book,
then start your answer exactly with this line:

{marker}

After that line, write a short guessed description.

Book details:
Title: {title}
Author: {author}
Genre: {genre}

Keep the description short (3-4 lines).
Do not mention AI, training data or model.
"#,
        marker = UNRECOGNIZED_MARKER,
        title = book.title,
        author = book.author,
        genre = book.genre.as_deref().unwrap_or(""),
    )
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Pulls the summary out of a successful provider response body.
///
/// Returns `None` when the body is not a `generateContent` response at all; a well-formed
/// response without usable text gives `NO_SUMMARY`.
pub fn parse_summary(body: &str) -> Option<String> {
    let response: GenerateContentResponse = serde_json::from_str(body).ok()?;
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        Some(NO_SUMMARY.to_string())
    } else {
        Some(text)
    }
}

/// Produces short book descriptions through the text-generation API.
#[derive(Clone)]
pub struct SummaryEnricher {
    client: Client,
    config: SummaryConfig,
}

impl SummaryEnricher {
    /// Creates an enricher whose HTTP client gives up after `config.timeout_secs`.
    pub fn new(config: SummaryConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Creates an enricher around an existing client.
    pub fn with_client(client: Client, config: SummaryConfig) -> Self {
        Self { client, config }
    }

    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        self.config.api_key().is_some()
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Returns a summary of `book`. Never fails.
    ///
    /// Makes at most one request. Nothing is cached or retried.
    pub async fn summarize(&self, book: &Book) -> String {
        let Some(api_key) = self.config.api_key() else {
            return NOT_CONFIGURED.to_string();
        };

        let prompt = build_prompt(book);
        let request = GenerateContentRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: &prompt }],
            }],
        };

        let response = match self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(id = book.id, error = %e, "summary request failed");
                return e.without_url().to_string();
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(id = book.id, error = %e, "failed to read summary response");
                return e.without_url().to_string();
            }
        };

        if !status.is_success() {
            tracing::warn!(id = book.id, %status, "summary provider returned an error");
            return surfaced(status, body);
        }

        match parse_summary(&body) {
            Some(summary) => summary,
            None => {
                tracing::warn!(id = book.id, "summary provider returned an unexpected body");
                surfaced(status, body)
            }
        }
    }
}

/// The provider's own body, or the status line when the body has nothing to show.
fn surfaced(status: reqwest::StatusCode, body: String) -> String {
    if body.trim().is_empty() {
        status.to_string()
    } else {
        body
    }
}
