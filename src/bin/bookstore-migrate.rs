//! Database migration tool for the bookstore catalog.
//!
//! Creates the database file when missing and applies the migrations embedded from
//! `migrations/`. `bookstored` does the same on startup; this exists for provisioning a
//! database ahead of time.

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use bookstore::{CatalogStore, SqlCatalogStore};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Options {
    #[arrrg(required, "SQLite database URL")]
    database_url: String,
}

const USAGE: &str = r#"Usage: bookstore-migrate --database-url <URL>

Run database migrations for the bookstore catalog.

Arguments:
  --database-url <URL>    SQLite database URL

Example:
  bookstore-migrate --database-url sqlite://bookstore.db

The migrations are embedded at compile time from the migrations/ directory."#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (options, free) = Options::from_command_line(USAGE);

    if !free.is_empty() {
        eprintln!("Error: Unexpected arguments: {:?}", free);
        eprintln!();
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    println!("Migrating database: {}", options.database_url);
    let store = SqlCatalogStore::connect(&options.database_url).await?;
    println!(
        "Migrations completed successfully; catalog holds {} books.",
        store.count().await?
    );

    Ok(())
}
