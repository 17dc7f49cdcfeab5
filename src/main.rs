//! mangashelf CLI entry point.

use clap::Parser;
use mangashelf::{
    config::{Cli, Command, Config},
    db::{BookOrder, Database},
    error::AppError,
    library::LibraryService,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mangashelf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Init { force } => cmd_init(&config, force),
        Command::Import {
            path,
            title,
            overwrite,
        } => cmd_import(&config, path, title, overwrite),
        Command::List { json, sort } => cmd_list(&config, json, &sort),
        Command::Rename { id, title } => cmd_rename(&config, id, &title),
        Command::Remove { id } => cmd_remove(&config, id),
        Command::Page {
            book_id,
            page_order,
            out,
        } => cmd_page(&config, book_id, page_order, out).await,
    }
}

/// Open the library service from config.
fn open_library(config: &Config) -> anyhow::Result<LibraryService> {
    let db = Database::open(&config.database.path)?;
    Ok(LibraryService::with_cover_capacity(
        db,
        config.cache.cover_capacity,
    ))
}

/// Initialize config and database.
fn cmd_init(config: &Config, force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    let _db = Database::open(&config.database.path)?;
    println!("Initialized database: {}", config.database.path.display());

    println!("\nImport a folder with: mangashelf import /path/to/book");

    Ok(())
}

/// Import or overwrite a folder of page images.
fn cmd_import(
    config: &Config,
    path: PathBuf,
    title: Option<String>,
    overwrite: bool,
) -> anyhow::Result<()> {
    // Store absolute paths so payload serving is independent of the
    // process working directory.
    let folder = path
        .canonicalize()
        .map_err(|_| AppError::DirectoryNotFound(path.clone()))?;

    let title = title.unwrap_or_else(|| {
        folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let library = open_library(config)?;

    let result = if overwrite {
        library.overwrite_book(&folder, &title)?
    } else {
        library.import_folder(&folder, &title)?
    };

    println!(
        "Imported \"{}\" ({} pages, id: {})",
        result.title, result.page_count, result.book_id
    );

    Ok(())
}

/// List registered books.
fn cmd_list(config: &Config, json: bool, sort: &str) -> anyhow::Result<()> {
    let order = match sort {
        "newest" => BookOrder::NewestFirst,
        "title" => BookOrder::TitleAsc,
        "title-desc" => BookOrder::TitleDesc,
        "created" => BookOrder::CreatedAsc,
        "created-desc" => BookOrder::CreatedDesc,
        other => anyhow::bail!("Unknown sort order: {}", other),
    };

    let library = open_library(config)?;
    let books = library.list_books_ordered(order)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("No books registered.");
        return Ok(());
    }

    println!("{:<6} {:<30} {:<7} {:<9} FOLDER", "ID", "TITLE", "PAGES", "LAST PAGE");
    println!("{}", "-".repeat(90));
    for book in books {
        println!(
            "{:<6} {:<30} {:<7} {:<9} {}",
            book.id, book.title, book.page_count, book.last_page_index, book.folder_path
        );
    }

    Ok(())
}

/// Rename a book.
fn cmd_rename(config: &Config, id: i64, title: &str) -> anyhow::Result<()> {
    let library = open_library(config)?;

    if library.rename_book(id, title)? {
        println!("Renamed book {} to \"{}\"", id, title);
    } else {
        println!("Book not found: {}", id);
    }

    Ok(())
}

/// Remove a book from the catalog.
fn cmd_remove(config: &Config, id: i64) -> anyhow::Result<()> {
    let library = open_library(config)?;

    if library.remove_book(id)? {
        println!("Removed book {} (image files left on disk)", id);
    } else {
        println!("Book not found: {}", id);
    }

    Ok(())
}

/// Extract one page's bytes.
async fn cmd_page(
    config: &Config,
    book_id: i64,
    page_order: i64,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let library = open_library(config)?;
    let payload = library.get_page_payload(book_id, page_order).await?;

    match out {
        Some(path) => {
            std::fs::write(&path, &payload.bytes)?;
            println!(
                "Wrote page {} of book {} ({}, {} bytes) to {}",
                page_order,
                book_id,
                payload.info.mime_type,
                payload.bytes.len(),
                path.display()
            );
        }
        None => {
            std::io::stdout().write_all(&payload.bytes)?;
        }
    }

    Ok(())
}
