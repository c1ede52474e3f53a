//! The book record and its field validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier assigned to a book by the catalog store.
pub type BookId = i64;

/////////////////////////////////////////////// Book ///////////////////////////////////////////////

/// A single catalog record.
///
/// `id` is assigned by the store when the book is added and never changes afterwards.
/// Descriptive fields other than title, author and genre are kept in `extra` and are
/// persisted and echoed without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Server-assigned identifier; 0 when the caller did not supply one.
    #[serde(default)]
    pub id: BookId,
    /// The book's title. Required.
    #[serde(default)]
    pub title: String,
    /// The book's author. Required.
    #[serde(default)]
    pub author: String,
    /// Optional genre label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Additional descriptive fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Book {
    /// Creates a book with no id, genre, or extra fields.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            author: author.into(),
            genre: None,
            extra: Map::new(),
        }
    }

    /// Sets the genre.
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Checks the fields a book must carry before it can be persisted.
    ///
    /// Every failing field is reported, not just the first one.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "The Title field is required."));
        }
        if self.author.trim().is_empty() {
            errors.push(FieldError::new("author", "The Author field is required."));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Decodes a book from an untyped JSON payload.
    ///
    /// Fields of the wrong JSON type are reported by name, all of them at once, instead of
    /// failing on the first one. Missing fields take their defaults and are left for
    /// `validate` to judge.
    pub fn from_json(value: Value) -> Result<Self, Vec<FieldError>> {
        let Value::Object(object) = &value else {
            return Err(vec![FieldError::new(
                "body",
                "The request body must be a JSON object.",
            )]);
        };

        let mut errors = Vec::new();
        if object.get("id").is_some_and(|id| id.as_i64().is_none()) {
            errors.push(FieldError::new("id", "The id field must be an integer."));
        }
        for (field, label) in [("title", "Title"), ("author", "Author")] {
            if object.get(field).is_some_and(|v| !v.is_string()) {
                errors.push(FieldError::new(
                    field,
                    format!("The {label} field must be a string."),
                ));
            }
        }
        if object
            .get("genre")
            .is_some_and(|v| !(v.is_string() || v.is_null()))
        {
            errors.push(FieldError::new("genre", "The Genre field must be a string."));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        serde_json::from_value(value).map_err(|e| vec![FieldError::new("body", e.to_string())])
    }

    /// Whether `needle` (already lowercased) occurs in the title or the author.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.author.to_lowercase().contains(needle)
    }
}

//////////////////////////////////////////// FieldError ////////////////////////////////////////////

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field as it appears on the wire.
    pub field: String,
    /// Human readable reason.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
