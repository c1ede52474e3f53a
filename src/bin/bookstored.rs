use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use bookstore::{
    AppState, BookstoreConfig, CatalogStore, InMemoryCatalogStore, SqlCatalogStore,
    SummaryEnricher, create_book_router, seed_if_empty,
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "Path to a YAML configuration file")]
    config: Option<String>,
    #[arrrg(optional, "Catalog database URL (sqlite::memory: or sqlite://path)")]
    database_url: Option<String>,
    #[arrrg(optional, "JSON file used to seed an empty catalog")]
    seed: Option<String>,
    #[arrrg(optional, "Host to bind the HTTP server")]
    host: Option<String>,
    #[arrrg(optional, "Port to bind the HTTP server")]
    port: Option<u16>,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

const HELP_TEXT: &str = r#"bookstored - Bookstore catalog daemon

USAGE:
    bookstored [OPTIONS]

OPTIONS:
    --config <PATH>          YAML configuration file
    --database-url <URL>     Catalog database [default: in-memory store]
    --seed <PATH>            Seed file loaded when the catalog is empty
    --host <HOST>            Host to bind the HTTP server [default: 127.0.0.1]
    --port <PORT>            Port to bind the HTTP server [default: 8080]
    --verbose                Enable verbose logging

ENVIRONMENT:
    BOOKSTORE_DATABASE_URL, BOOKSTORE_PAGE_SIZE, BOOKSTORE_SEED_FILE,
    GEMINI_API_KEY, GEMINI_MODEL, RUST_LOG

DESCRIPTION:
    Runs the bookstore catalog with endpoints mounted under /api/v1/.
    Without GEMINI_API_KEY, summaries report that they are not configured.

    The server supports graceful shutdown via Ctrl+C.

API ENDPOINTS:
    GET    /api/v1/books                 List books (?search=&page=)
    POST   /api/v1/books                 Create a book
    GET    /api/v1/books/{id}            Get a book
    PUT    /api/v1/books/{id}            Replace a book
    DELETE /api/v1/books/{id}            Delete a book
    GET    /api/v1/books/{id}/summary    Generate a summary
    GET    /api/v1/books/{id}/details    Get a book with its summary"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = Args::from_command_line("USAGE: bookstored [OPTIONS]");

    if !free.is_empty() && free[0] == "help" {
        println!("{}", HELP_TEXT);
        return Ok(());
    }

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = ServerConfig::from_args(args)?;
    tracing::debug!(
        database = config.catalog.database_url.as_deref().unwrap_or("in-memory"),
        page_size = config.catalog.page_size,
        summaries = config.catalog.summary.api_key().is_some(),
        "loaded configuration"
    );

    let catalog: Arc<dyn CatalogStore> = match &config.catalog.database_url {
        Some(url) => Arc::new(SqlCatalogStore::connect(url).await?),
        None => Arc::new(InMemoryCatalogStore::new()),
    };

    if let Some(seed_file) = &config.catalog.seed_file {
        seed_if_empty(catalog.as_ref(), seed_file).await?;
    }

    if config.catalog.summary.api_key().is_none() {
        tracing::warn!("no summary API key configured; summaries will use fallback text");
    }
    let summaries = SummaryEnricher::new(config.catalog.summary.clone())?;
    let state = AppState::new(catalog, summaries, config.catalog.page_size);

    let app = Router::new().nest("/api/v1", create_book_router(state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!(%addr, "bookstore daemon listening; Ctrl+C to stop");

    let shutdown_signal = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        () = shutdown_signal => {
            tracing::info!("shutdown signal received; bookstore daemon stopped");
        }
    }

    Ok(())
}

struct ServerConfig {
    catalog: BookstoreConfig,
    host: String,
    port: u16,
}

impl ServerConfig {
    fn from_args(args: Args) -> Result<Self, bookstore::ConfigError> {
        let mut catalog = BookstoreConfig::load(args.config.as_deref().map(std::path::Path::new))?;

        if let Some(url) = args.database_url.filter(|u| !u.trim().is_empty()) {
            catalog.database_url = Some(url);
        }
        if let Some(seed) = args.seed.filter(|s| !s.trim().is_empty()) {
            catalog.seed_file = Some(PathBuf::from(seed));
        }

        Ok(Self {
            catalog,
            host: args.host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: args.port.unwrap_or(8080),
        })
    }
}
