use crate::db::{BookOrder, BookRow, PageRow, now_timestamp_ms};
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
///
/// All writes go through the single connection, so concurrent imports of the
/// same folder serialize at the transaction boundary and can never interleave
/// their page replacement steps.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA foreign_keys = ON;

            -- Books table
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                folder_path TEXT NOT NULL UNIQUE,
                cover_path TEXT NOT NULL,
                page_count INTEGER NOT NULL,
                last_page_index INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );

            -- Pages table
            CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY,
                book_id INTEGER NOT NULL,
                image_path TEXT NOT NULL,
                page_order INTEGER NOT NULL,
                UNIQUE (book_id, page_order),
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_images_book_id ON images(book_id);
            "#,
        )
        .map_err(|e| AppError::Database(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== BOOK + PAGE WRITES ==========

    /// Insert or update a book and replace its page set, atomically.
    ///
    /// On a `folder_path` conflict the existing row keeps its id and
    /// `created_at`; title, cover and page count are updated in place, and
    /// `last_page_index` is reset to 0 only when `reset_progress` is set.
    /// The page rows for the book are deleted and recreated with
    /// `page_order` equal to the slice index. Returns the book id.
    pub fn upsert_book_with_pages(
        &self,
        folder_path: &str,
        title: &str,
        cover_path: &str,
        pages: &[String],
        reset_progress: bool,
    ) -> Result<i64> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| db_err("Failed to begin import transaction", e))?;

        let book_id = Self::upsert_book(
            &tx,
            folder_path,
            title,
            cover_path,
            pages.len() as i64,
            reset_progress,
        )?;
        Self::replace_pages(&tx, book_id, pages)?;

        tx.commit()
            .map_err(|e| db_err("Failed to commit import transaction", e))?;

        Ok(book_id)
    }

    /// Upsert the book row inside an open transaction.
    fn upsert_book(
        tx: &Transaction<'_>,
        folder_path: &str,
        title: &str,
        cover_path: &str,
        page_count: i64,
        reset_progress: bool,
    ) -> Result<i64> {
        let sql = if reset_progress {
            "INSERT INTO books (title, folder_path, cover_path, page_count, last_page_index, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)
             ON CONFLICT (folder_path) DO UPDATE SET
                title = excluded.title,
                cover_path = excluded.cover_path,
                page_count = excluded.page_count,
                last_page_index = 0"
        } else {
            "INSERT INTO books (title, folder_path, cover_path, page_count, last_page_index, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)
             ON CONFLICT (folder_path) DO UPDATE SET
                title = excluded.title,
                cover_path = excluded.cover_path,
                page_count = excluded.page_count"
        };

        tx.execute(
            sql,
            params![title, folder_path, cover_path, page_count, now_timestamp_ms()],
        )
        .map_err(|e| db_err("Failed to upsert book", e))?;

        // last_insert_rowid is stale on the conflict path, so resolve the id
        // through the natural key instead.
        tx.query_row(
            "SELECT id FROM books WHERE folder_path = ?1",
            params![folder_path],
            |row| row.get(0),
        )
        .map_err(|e| db_err("Failed to resolve book id", e))
    }

    /// Replace all page rows of a book inside an open transaction.
    fn replace_pages(tx: &Transaction<'_>, book_id: i64, pages: &[String]) -> Result<()> {
        tx.execute("DELETE FROM images WHERE book_id = ?1", params![book_id])
            .map_err(|e| db_err("Failed to clear pages", e))?;

        let mut stmt = tx
            .prepare("INSERT INTO images (book_id, image_path, page_order) VALUES (?1, ?2, ?3)")
            .map_err(|e| db_err("Failed to prepare page insert", e))?;

        for (page_order, image_path) in pages.iter().enumerate() {
            stmt.execute(params![book_id, image_path, page_order as i64])
                .map_err(|e| db_err("Failed to insert page", e))?;
        }

        Ok(())
    }

    // ========== BOOK READS ==========

    /// Get book by ID.
    pub fn get_book(&self, id: i64) -> Result<Option<BookRow>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, title, folder_path, cover_path, page_count, last_page_index, created_at
             FROM books WHERE id = ?1",
            params![id],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| db_err("Failed to get book", e))
    }

    /// Get book by its folder path.
    pub fn get_book_by_folder_path(&self, folder_path: &str) -> Result<Option<BookRow>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, title, folder_path, cover_path, page_count, last_page_index, created_at
             FROM books WHERE folder_path = ?1",
            params![folder_path],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| db_err("Failed to get book by folder path", e))
    }

    /// List all books in the given order.
    pub fn list_books(&self, order: BookOrder) -> Result<Vec<BookRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, title, folder_path, cover_path, page_count, last_page_index, created_at
                 FROM books ORDER BY {}",
                order.sql()
            ))
            .map_err(|e| db_err("Failed to prepare query", e))?;

        let books = stmt
            .query_map([], Self::row_to_book)
            .map_err(|e| db_err("Failed to list books", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| db_err("Failed to collect books", e))?;

        Ok(books)
    }

    /// Helper to convert a row to BookRow.
    fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookRow> {
        Ok(BookRow {
            id: row.get(0)?,
            title: row.get(1)?,
            folder_path: row.get(2)?,
            cover_path: row.get(3)?,
            page_count: row.get(4)?,
            last_page_index: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    // ========== PAGE READS ==========

    /// Get one page of a book by its zero-based order.
    pub fn get_page(&self, book_id: i64, page_order: i64) -> Result<Option<PageRow>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, book_id, image_path, page_order
             FROM images WHERE book_id = ?1 AND page_order = ?2",
            params![book_id, page_order],
            Self::row_to_page,
        )
        .optional()
        .map_err(|e| db_err("Failed to get page", e))
    }

    /// List all pages of a book in reading order.
    pub fn list_pages(&self, book_id: i64) -> Result<Vec<PageRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, book_id, image_path, page_order
                 FROM images WHERE book_id = ?1 ORDER BY page_order",
            )
            .map_err(|e| db_err("Failed to prepare query", e))?;

        let pages = stmt
            .query_map(params![book_id], Self::row_to_page)
            .map_err(|e| db_err("Failed to list pages", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| db_err("Failed to collect pages", e))?;

        Ok(pages)
    }

    /// Helper to convert a row to PageRow.
    fn row_to_page(row: &rusqlite::Row<'_>) -> rusqlite::Result<PageRow> {
        Ok(PageRow {
            id: row.get(0)?,
            book_id: row.get(1)?,
            image_path: row.get(2)?,
            page_order: row.get(3)?,
        })
    }

    // ========== BOOK UPDATES ==========

    /// Persist reading progress. Returns whether a row was affected.
    pub fn update_last_page_index(&self, book_id: i64, index: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE books SET last_page_index = ?1 WHERE id = ?2",
                params![index, book_id],
            )
            .map_err(|e| db_err("Failed to update last page index", e))?;
        Ok(rows > 0)
    }

    /// Rename a book. Returns whether a row was affected.
    pub fn rename_book(&self, book_id: i64, title: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE books SET title = ?1 WHERE id = ?2",
                params![title, book_id],
            )
            .map_err(|e| db_err("Failed to rename book", e))?;
        Ok(rows > 0)
    }

    /// Delete a book, cascading to its pages. Returns whether a row was
    /// affected.
    pub fn delete_book(&self, book_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM books WHERE id = ?1", params![book_id])
            .map_err(|e| db_err("Failed to delete book", e))?;
        Ok(rows > 0)
    }
}

/// Map a rusqlite error, surfacing constraint failures as their own variant.
fn db_err(context: &str, e: rusqlite::Error) -> AppError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e
        && err.code == rusqlite::ErrorCode::ConstraintViolation
    {
        return AppError::ConstraintViolation(e.to_string());
    }
    AppError::Database(format!("{}: {}", context, e))
}
