//! Configuration management for the bookstore daemon.
//!
//! Settings are layered, lowest precedence first: built-in defaults, an optional YAML
//! file, environment variables, then command-line flags (applied by the binary). Blank
//! values are treated as absent at every layer.
//!
//! ```yaml
//! database_url: sqlite://bookstore.db
//! page_size: 5
//! seed_file: SeedData/books.json
//! summary:
//!   api_key: your-key
//!   model: gemini-2.5-flash
//!   timeout_secs: 30
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Books per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 5;
/// Text-generation model used for summaries by default.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Base URL of the text-generation API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Upper bound on a single summary request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The configuration file is not valid YAML for this schema.
    #[error("failed to parse config file {path}: {message}")]
    Parse {
        /// The file that was being parsed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// An environment variable held a value of the wrong type.
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv {
        /// Variable name.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// Settings for the summary provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// API key for the provider. `None` disables summaries.
    pub api_key: Option<String>,
    /// Model name inserted into the request path.
    pub model: String,
    /// API base URL, without a trailing `/models`.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SummaryConfig {
    /// The configured API key, if it is present and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookstoreConfig {
    /// Catalog store connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Books per list page.
    pub page_size: u32,
    /// JSON file used to seed an empty catalog.
    pub seed_file: Option<PathBuf>,
    /// Summary provider settings.
    pub summary: SummaryConfig,
}

impl Default for BookstoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            seed_file: None,
            summary: SummaryConfig::default(),
        }
    }
}

impl BookstoreConfig {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(yaml)
    }

    /// Reads and parses a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads the file at `path` when given, else the defaults, then applies the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overrides fields from environment variables looked up through `lookup`.
    ///
    /// Recognized: `BOOKSTORE_DATABASE_URL`, `BOOKSTORE_PAGE_SIZE`, `BOOKSTORE_SEED_FILE`,
    /// `GEMINI_API_KEY`, `GEMINI_MODEL`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("BOOKSTORE_DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(size) = get("BOOKSTORE_PAGE_SIZE") {
            self.page_size = size
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    name: "BOOKSTORE_PAGE_SIZE".to_string(),
                    value: size.clone(),
                })?;
        }
        if let Some(seed) = get("BOOKSTORE_SEED_FILE") {
            self.seed_file = Some(PathBuf::from(seed));
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.summary.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.summary.model = model;
        }
        Ok(())
    }
}
