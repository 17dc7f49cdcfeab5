mod schema;

pub use schema::Database;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A registered folder of page images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRow {
    /// Unique book ID.
    pub id: i64,
    /// User-editable title, independent of the folder name.
    pub title: String,
    /// Absolute folder path; the natural key for idempotent re-import.
    pub folder_path: String,
    /// Path of the first page at import time.
    pub cover_path: String,
    /// Cached count of associated page rows.
    pub page_count: i64,
    /// Zero-based persisted reading progress.
    pub last_page_index: i64,
    /// Creation timestamp in epoch milliseconds, set once at first insert.
    pub created_at: i64,
}

/// One image belonging to a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRow {
    /// Unique page ID.
    pub id: i64,
    /// Owning book ID.
    pub book_id: i64,
    /// Absolute path of the image file; referenced, never copied.
    pub image_path: String,
    /// Zero-based rank within the book.
    pub page_order: i64,
}

/// Orderings for the book listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookOrder {
    /// Newest first (id descending).
    #[default]
    NewestFirst,
    /// Title ascending, case-insensitive.
    TitleAsc,
    /// Title descending, case-insensitive.
    TitleDesc,
    /// Oldest creation timestamp first.
    CreatedAsc,
    /// Newest creation timestamp first.
    CreatedDesc,
}

impl BookOrder {
    /// ORDER BY clause for this ordering; id breaks ties deterministically.
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            BookOrder::NewestFirst => "id DESC",
            BookOrder::TitleAsc => "title COLLATE NOCASE ASC, id DESC",
            BookOrder::TitleDesc => "title COLLATE NOCASE DESC, id DESC",
            BookOrder::CreatedAsc => "created_at ASC, id ASC",
            BookOrder::CreatedDesc => "created_at DESC, id DESC",
        }
    }
}

/// Current time in epoch milliseconds.
pub fn now_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
