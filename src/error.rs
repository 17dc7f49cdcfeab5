use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Scan target directory does not exist.
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Scan target directory contains no supported image files.
    #[error("No images found in: {0}")]
    NoImagesFound(PathBuf),

    /// No book with the given id or folder path.
    #[error("Book not found: {0}")]
    BookNotFound(String),

    /// No page at the given order for the given book.
    #[error("Page {page_order} not found for book {book_id}")]
    PageNotFound {
        /// Book the page was requested for.
        book_id: i64,
        /// Zero-based page order that was requested.
        page_order: i64,
    },

    /// A referenced image file could not be read at serve time.
    #[error("File unavailable: {0}")]
    FileUnavailable(PathBuf),

    /// Store-level invariant breach (unique key, foreign key).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
