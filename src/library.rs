//! Library orchestration: import, overwrite, page serving.

use crate::cover::{self, CoverCache};
use crate::db::{BookOrder, BookRow, Database};
use crate::error::{AppError, Result};
use crate::formats::guess_mime_type;
use crate::scanner::scan_folder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of a successful import or overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    /// Id of the inserted or updated book.
    pub book_id: i64,
    /// Title the book was registered under.
    pub title: String,
    /// Number of pages found by the scan.
    pub page_count: i64,
}

/// A book as presented to the reader front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSummary {
    /// Unique book ID.
    pub id: i64,
    /// Book title.
    pub title: String,
    /// Number of pages.
    pub page_count: i64,
    /// Zero-based persisted reading progress.
    pub last_page_index: i64,
    /// Path of the cover image.
    pub cover_path: String,
    /// Folder the book was imported from.
    pub folder_path: String,
    /// MIME type sniffed from the cover path.
    pub mime_type: String,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

impl From<BookRow> for BookSummary {
    fn from(row: BookRow) -> Self {
        let mime_type = guess_mime_type(Path::new(&row.cover_path)).to_string();
        Self {
            id: row.id,
            title: row.title,
            page_count: row.page_count,
            last_page_index: row.last_page_index,
            cover_path: row.cover_path,
            folder_path: row.folder_path,
            mime_type,
            created_at: row.created_at,
        }
    }
}

/// Metadata for one served page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    /// Unique page ID.
    pub id: i64,
    /// Owning book ID.
    pub book_id: i64,
    /// Path of the image file on disk.
    pub image_path: String,
    /// Zero-based rank within the book.
    pub page_order: i64,
    /// MIME type sniffed from the image path.
    pub mime_type: String,
}

/// A page's metadata together with its raw bytes.
#[derive(Debug, Clone)]
pub struct PagePayload {
    /// Page metadata.
    pub info: PageInfo,
    /// Raw image bytes, served verbatim.
    pub bytes: Vec<u8>,
}

/// Orchestrates the folder scanner and the store.
///
/// Cheap catalog operations are synchronous; operations that read image bytes
/// off disk are async so concurrent requests do not block each other.
#[derive(Clone)]
pub struct LibraryService {
    db: Database,
    covers: Arc<CoverCache>,
}

impl LibraryService {
    /// Create a service over an open database with the default cover cache.
    pub fn new(db: Database) -> Self {
        Self::with_cover_capacity(db, CoverCache::DEFAULT_CAPACITY)
    }

    /// Create a service with an explicit cover cache capacity.
    pub fn with_cover_capacity(db: Database, capacity: usize) -> Self {
        Self {
            db,
            covers: Arc::new(CoverCache::new(capacity)),
        }
    }

    // ========== IMPORT ==========

    /// Register a folder of page images as a book.
    ///
    /// The folder is scanned, the first page in scan order becomes the cover,
    /// and the book row plus its full page set are written in one
    /// transaction. Importing an already-registered folder updates it in
    /// place (same book id) and keeps its reading progress; this is the
    /// unconditional first-import path, in contrast to [`Self::overwrite_book`].
    /// Scan failures abort before any store mutation.
    pub fn import_folder(&self, folder: &Path, title: &str) -> Result<ImportResult> {
        let files = scan_folder(folder)?;
        let pages: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let cover_path = pages[0].clone();

        let book_id = self.db.upsert_book_with_pages(
            &folder.to_string_lossy(),
            title,
            &cover_path,
            &pages,
            false,
        )?;

        tracing::info!(
            book_id,
            pages = pages.len(),
            folder = %folder.display(),
            "Imported folder"
        );

        Ok(ImportResult {
            book_id,
            title: title.to_string(),
            page_count: pages.len() as i64,
        })
    }

    /// Re-import an already-registered folder after explicit confirmation.
    ///
    /// Fails with [`AppError::BookNotFound`] when the folder path is not in
    /// the catalog. Otherwise runs the same scan and transactional
    /// upsert-plus-page-replacement as [`Self::import_folder`], additionally
    /// resetting the reading progress to page 0.
    pub fn overwrite_book(&self, folder: &Path, title: &str) -> Result<ImportResult> {
        let folder_str = folder.to_string_lossy();
        if self.db.get_book_by_folder_path(&folder_str)?.is_none() {
            return Err(AppError::BookNotFound(folder_str.into_owned()));
        }

        let files = scan_folder(folder)?;
        let pages: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let cover_path = pages[0].clone();

        let book_id = self
            .db
            .upsert_book_with_pages(&folder_str, title, &cover_path, &pages, true)?;

        tracing::info!(
            book_id,
            pages = pages.len(),
            folder = %folder.display(),
            "Overwrote book"
        );

        Ok(ImportResult {
            book_id,
            title: title.to_string(),
            page_count: pages.len() as i64,
        })
    }

    // ========== CATALOG ==========

    /// List all books, newest first.
    pub fn list_books(&self) -> Result<Vec<BookSummary>> {
        self.list_books_ordered(BookOrder::NewestFirst)
    }

    /// List all books in an explicit order.
    pub fn list_books_ordered(&self, order: BookOrder) -> Result<Vec<BookSummary>> {
        let rows = self.db.list_books(order)?;
        Ok(rows.into_iter().map(BookSummary::from).collect())
    }

    /// Get a book row by id.
    pub fn get_book(&self, book_id: i64) -> Result<Option<BookRow>> {
        self.db.get_book(book_id)
    }

    /// Check whether a folder is already registered.
    pub fn find_book_by_folder_path(&self, folder: &Path) -> Result<Option<BookRow>> {
        self.db.get_book_by_folder_path(&folder.to_string_lossy())
    }

    /// Rename a book. Returns false when the id is unknown.
    pub fn rename_book(&self, book_id: i64, title: &str) -> Result<bool> {
        self.db.rename_book(book_id, title)
    }

    /// Remove a book and its page rows from the catalog.
    ///
    /// Returns false when the id is unknown. Image files on disk are left
    /// untouched; the catalog only ever held references to them.
    pub fn remove_book(&self, book_id: i64) -> Result<bool> {
        let removed = self.db.delete_book(book_id)?;
        if removed {
            tracing::info!(book_id, "Removed book");
        }
        Ok(removed)
    }

    /// Persist reading progress for a book.
    ///
    /// The index is clamped into `[0, page_count)` before the write, so the
    /// stored progress always satisfies the catalog invariant. Fails with
    /// [`AppError::BookNotFound`] when the id is unknown.
    pub fn update_last_page_index(&self, book_id: i64, index: i64) -> Result<()> {
        let book = self
            .db
            .get_book(book_id)?
            .ok_or_else(|| AppError::BookNotFound(book_id.to_string()))?;

        let clamped = index.clamp(0, (book.page_count - 1).max(0));
        self.db.update_last_page_index(book_id, clamped)?;
        Ok(())
    }

    // ========== PAGE + COVER SERVING ==========

    /// Read one page's bytes with MIME inference.
    ///
    /// Fails with [`AppError::PageNotFound`] when no such page row exists,
    /// and with [`AppError::FileUnavailable`] when the row exists but the
    /// referenced file cannot be read (moved or deleted after import), so
    /// the two cases stay distinguishable to the caller.
    pub async fn get_page_payload(&self, book_id: i64, page_order: i64) -> Result<PagePayload> {
        let page = self
            .db
            .get_page(book_id, page_order)?
            .ok_or(AppError::PageNotFound {
                book_id,
                page_order,
            })?;

        let bytes = tokio::fs::read(&page.image_path)
            .await
            .map_err(|_| AppError::FileUnavailable(PathBuf::from(&page.image_path)))?;

        let mime_type = guess_mime_type(Path::new(&page.image_path)).to_string();

        Ok(PagePayload {
            info: PageInfo {
                id: page.id,
                book_id: page.book_id,
                image_path: page.image_path,
                page_order: page.page_order,
                mime_type,
            },
            bytes,
        })
    }

    /// Read a book's cover bytes.
    ///
    /// Returns `None` when the book does not exist or the cover file is
    /// unreadable; thumbnail absence is benign and the caller renders a
    /// placeholder.
    pub async fn get_thumbnail(&self, book_id: i64) -> Option<Vec<u8>> {
        let book = self.db.get_book(book_id).ok().flatten()?;
        tokio::fs::read(&book.cover_path).await.ok()
    }

    /// Build a base64 data URL for a book's cover, using the bounded cache.
    ///
    /// Returns `None` when the book does not exist or the cover file is
    /// unreadable. A cached entry is returned as-is even if the file changed
    /// on disk since it was built.
    pub async fn cover_data_url(&self, book_id: i64) -> Option<String> {
        let book = self.db.get_book(book_id).ok().flatten()?;

        if let Some(cached) = self.covers.get(&book.cover_path) {
            return Some(cached);
        }

        let bytes = match tokio::fs::read(&book.cover_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(cover = %book.cover_path, error = %e, "Failed to load cover");
                return None;
            }
        };

        let data_url = cover::to_data_url(guess_mime_type(Path::new(&book.cover_path)), &bytes);
        self.covers.put(&book.cover_path, data_url.clone());

        Some(data_url)
    }
}
