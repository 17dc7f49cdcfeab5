use crate::config::Config;
use crate::cover::{CoverCache, to_data_url};
use crate::db::{BookOrder, Database};
use crate::error::AppError;
use crate::formats::{ImageFormat, guess_mime_type};
use crate::library::LibraryService;
use crate::scanner::{natural_cmp, scan_folder};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn test_library() -> LibraryService {
    LibraryService::new(Database::open_memory().unwrap())
}

fn test_db_and_library() -> (Database, LibraryService) {
    let db = Database::open_memory().unwrap();
    (db.clone(), LibraryService::new(db))
}

fn book_dir(root: &Path, name: &str, files: &[&str]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    for file in files {
        fs::write(dir.join(file), format!("bytes-of-{}", file)).unwrap();
    }
    dir
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

// ========== SCANNER ==========

#[test]
fn scan_orders_pages_numerically() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["10.jpeg", "notes.txt", "2.png", "1.jpg"]);

    let files = scan_folder(&dir).unwrap();
    assert_eq!(file_names(&files), vec!["1.jpg", "2.png", "10.jpeg"]);
}

#[test]
fn scan_excludes_unsupported_extensions() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(
        tmp.path(),
        "book",
        &["1.jpg", "2.gif", "3.webp", "4.txt", "cover", "5.png.bak"],
    );

    let files = scan_folder(&dir).unwrap();
    assert_eq!(file_names(&files), vec!["1.jpg"]);
}

#[test]
fn scan_extension_match_is_case_insensitive() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.JPG", "2.PnG", "3.Jpeg"]);

    let files = scan_folder(&dir).unwrap();
    assert_eq!(file_names(&files), vec!["1.JPG", "2.PnG", "3.Jpeg"]);
}

#[test]
fn scan_missing_directory_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("does-not-exist");

    let err = scan_folder(&missing).unwrap_err();
    assert!(matches!(err, AppError::DirectoryNotFound(_)));
}

#[test]
fn scan_directory_without_images_fails() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["notes.txt", "readme.md"]);

    let err = scan_folder(&dir).unwrap_err();
    assert!(matches!(err, AppError::NoImagesFound(_)));
}

#[test]
fn natural_cmp_compares_digit_runs_numerically() {
    assert_eq!(natural_cmp("2.png", "10.jpeg"), Ordering::Less);
    assert_eq!(natural_cmp("page2", "page10"), Ordering::Less);
    assert_eq!(natural_cmp("page10", "page2"), Ordering::Greater);
    assert_eq!(natural_cmp("ch1p5", "ch1p12"), Ordering::Less);
}

#[test]
fn natural_cmp_is_case_insensitive_with_total_tiebreak() {
    assert_eq!(natural_cmp("Page2.jpg", "page10.jpg"), Ordering::Less);
    // Numerically equal names stay distinguishable so the sort is stable
    // across runs.
    assert_eq!(natural_cmp("01.jpg", "1.jpg"), Ordering::Less);
    assert_eq!(natural_cmp("1.jpg", "1.jpg"), Ordering::Equal);
}

// ========== MIME ==========

#[test]
fn mime_sniffing_from_extension() {
    assert_eq!(guess_mime_type(Path::new("a.png")), "image/png");
    assert_eq!(guess_mime_type(Path::new("a.webp")), "image/webp");
    assert_eq!(guess_mime_type(Path::new("a.jpg")), "image/jpeg");
    assert_eq!(guess_mime_type(Path::new("a.JPEG")), "image/jpeg");
    assert_eq!(guess_mime_type(Path::new("a.bmp")), "image/jpeg");
    assert_eq!(guess_mime_type(Path::new("noext")), "image/jpeg");
}

#[test]
fn webp_is_served_but_not_importable() {
    assert!(ImageFormat::Jpeg.importable());
    assert!(ImageFormat::Png.importable());
    assert!(!ImageFormat::Webp.importable());
}

// ========== COVER CACHE ==========

#[test]
fn cover_cache_evicts_oldest_inserted() {
    let cache = CoverCache::new(10);
    for i in 0..11 {
        cache.put(&format!("/covers/{}.jpg", i), format!("url-{}", i));
    }

    assert_eq!(cache.len(), 10);
    assert!(cache.get("/covers/0.jpg").is_none());
    for i in 1..11 {
        assert_eq!(
            cache.get(&format!("/covers/{}.jpg", i)),
            Some(format!("url-{}", i))
        );
    }
}

#[test]
fn cover_cache_hit_does_not_refresh_position() {
    let cache = CoverCache::new(10);
    for i in 0..10 {
        cache.put(&format!("/covers/{}.jpg", i), format!("url-{}", i));
    }

    // A hit must not save the oldest entry from eviction.
    assert!(cache.get("/covers/0.jpg").is_some());
    cache.put("/covers/10.jpg", "url-10".to_string());

    assert!(cache.get("/covers/0.jpg").is_none());
    assert!(cache.get("/covers/10.jpg").is_some());
}

#[test]
fn cover_cache_reinsert_updates_value_in_place() {
    let cache = CoverCache::new(3);
    cache.put("a", "one".to_string());
    cache.put("b", "two".to_string());
    cache.put("c", "three".to_string());

    cache.put("a", "updated".to_string());
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.get("a"), Some("updated".to_string()));

    // "a" kept its original slot, so it is still the first to go.
    cache.put("d", "four".to_string());
    assert!(cache.get("a").is_none());
    assert!(cache.get("b").is_some());
}

#[test]
fn data_url_encodes_mime_and_bytes() {
    assert_eq!(to_data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
}

// ========== IMPORT ==========

#[test]
fn import_registers_book_and_pages() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "one-piece", &["1.jpg", "2.png", "10.jpeg"]);
    let (db, library) = test_db_and_library();

    let result = library.import_folder(&dir, "One Piece").unwrap();
    assert_eq!(result.title, "One Piece");
    assert_eq!(result.page_count, 3);

    let book = library.get_book(result.book_id).unwrap().unwrap();
    assert_eq!(book.title, "One Piece");
    assert_eq!(book.folder_path, dir.to_string_lossy());
    assert_eq!(book.cover_path, dir.join("1.jpg").to_string_lossy());
    assert_eq!(book.page_count, 3);
    assert_eq!(book.last_page_index, 0);
    assert!(book.created_at > 0);

    let pages = db.list_pages(result.book_id).unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].image_path, dir.join("1.jpg").to_string_lossy());
    assert_eq!(pages[2].image_path, dir.join("10.jpeg").to_string_lossy());
}

#[test]
fn import_failure_leaves_store_untouched() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "empty", &["notes.txt"]);
    let library = test_library();

    assert!(library.import_folder(&dir, "Empty").is_err());
    assert!(library.find_book_by_folder_path(&dir).unwrap().is_none());
    assert!(library.list_books().unwrap().is_empty());
}

#[test]
fn import_same_folder_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg", "2.jpg", "3.jpg"]);
    let (db, library) = test_db_and_library();

    let first = library.import_folder(&dir, "Book").unwrap();
    let second = library.import_folder(&dir, "Book").unwrap();
    assert_eq!(first.book_id, second.book_id);

    // Pages are replaced, not duplicated.
    let pages = db.list_pages(first.book_id).unwrap();
    assert_eq!(pages.len(), 3);

    let book = library.get_book(first.book_id).unwrap().unwrap();
    assert_eq!(book.page_count, 3);
    assert_eq!(library.list_books().unwrap().len(), 1);
}

#[test]
fn reimport_preserves_progress_and_created_at() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg", "2.jpg", "3.jpg"]);
    let library = test_library();

    let result = library.import_folder(&dir, "Old Title").unwrap();
    library.update_last_page_index(result.book_id, 1).unwrap();
    let before = library.get_book(result.book_id).unwrap().unwrap();

    library.import_folder(&dir, "New Title").unwrap();

    let after = library.get_book(result.book_id).unwrap().unwrap();
    assert_eq!(after.title, "New Title");
    assert_eq!(after.last_page_index, 1);
    assert_eq!(after.created_at, before.created_at);
}

#[test]
fn reimport_reflects_current_disk_contents() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg", "2.jpg"]);
    let (db, library) = test_db_and_library();

    let result = library.import_folder(&dir, "Book").unwrap();
    assert_eq!(result.page_count, 2);

    fs::write(dir.join("3.jpg"), "bytes-of-3.jpg").unwrap();
    let result = library.import_folder(&dir, "Book").unwrap();
    assert_eq!(result.page_count, 3);

    let pages = db.list_pages(result.book_id).unwrap();
    let orders: Vec<i64> = pages.iter().map(|p| p.page_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[test]
fn page_orders_are_contiguous_from_zero() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["5.jpg", "1.jpg", "30.jpg", "2.jpg"]);
    let (db, library) = test_db_and_library();

    let result = library.import_folder(&dir, "Book").unwrap();
    let book = library.get_book(result.book_id).unwrap().unwrap();

    let pages = db.list_pages(result.book_id).unwrap();
    let orders: Vec<i64> = pages.iter().map(|p| p.page_order).collect();
    assert_eq!(orders, (0..book.page_count).collect::<Vec<i64>>());
}

// ========== OVERWRITE ==========

#[test]
fn overwrite_requires_existing_book() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg"]);
    let library = test_library();

    let err = library.overwrite_book(&dir, "Book").unwrap_err();
    assert!(matches!(err, AppError::BookNotFound(_)));
    assert!(library.find_book_by_folder_path(&dir).unwrap().is_none());
}

#[test]
fn overwrite_resets_progress_and_resyncs_pages() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg", "2.jpg", "3.jpg"]);
    let (db, library) = test_db_and_library();

    let result = library.import_folder(&dir, "Book").unwrap();
    library.update_last_page_index(result.book_id, 2).unwrap();

    fs::remove_file(dir.join("3.jpg")).unwrap();
    let overwritten = library.overwrite_book(&dir, "Book v2").unwrap();
    assert_eq!(overwritten.book_id, result.book_id);
    assert_eq!(overwritten.page_count, 2);

    let book = library.get_book(result.book_id).unwrap().unwrap();
    assert_eq!(book.title, "Book v2");
    assert_eq!(book.page_count, 2);
    assert_eq!(book.last_page_index, 0);

    // The page set matches the new scan, not the old one.
    let pages = db.list_pages(result.book_id).unwrap();
    let orders: Vec<i64> = pages.iter().map(|p| p.page_order).collect();
    assert_eq!(orders, vec![0, 1]);
}

// ========== CATALOG ==========

#[test]
fn list_books_is_newest_first() {
    let tmp = TempDir::new().unwrap();
    let first = book_dir(tmp.path(), "first", &["1.jpg"]);
    let second = book_dir(tmp.path(), "second", &["1.png"]);
    let library = test_library();

    let a = library.import_folder(&first, "First").unwrap();
    let b = library.import_folder(&second, "Second").unwrap();

    let books = library.list_books().unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].id, b.book_id);
    assert_eq!(books[1].id, a.book_id);
    assert_eq!(books[0].mime_type, "image/png");
    assert_eq!(books[1].mime_type, "image/jpeg");
}

#[test]
fn list_books_honors_explicit_ordering() {
    let tmp = TempDir::new().unwrap();
    let beta = book_dir(tmp.path(), "beta", &["1.jpg"]);
    let alpha = book_dir(tmp.path(), "alpha", &["1.jpg"]);
    let library = test_library();

    library.import_folder(&beta, "Beta").unwrap();
    library.import_folder(&alpha, "alpha").unwrap();

    let titles: Vec<String> = library
        .list_books_ordered(BookOrder::TitleAsc)
        .unwrap()
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(titles, vec!["alpha", "Beta"]);

    let titles: Vec<String> = library
        .list_books_ordered(BookOrder::CreatedAsc)
        .unwrap()
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(titles, vec!["Beta", "alpha"]);
}

#[test]
fn find_book_by_folder_path_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg"]);
    let library = test_library();

    assert!(library.find_book_by_folder_path(&dir).unwrap().is_none());

    let result = library.import_folder(&dir, "Book").unwrap();
    let found = library.find_book_by_folder_path(&dir).unwrap().unwrap();
    assert_eq!(found.id, result.book_id);
}

#[test]
fn rename_reports_whether_a_row_changed() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg"]);
    let library = test_library();

    assert!(!library.rename_book(999, "Nope").unwrap());

    let result = library.import_folder(&dir, "Book").unwrap();
    assert!(library.rename_book(result.book_id, "Renamed").unwrap());

    let book = library.get_book(result.book_id).unwrap().unwrap();
    assert_eq!(book.title, "Renamed");
}

#[test]
fn remove_cascades_to_pages_and_keeps_files() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg", "2.jpg"]);
    let (db, library) = test_db_and_library();

    assert!(!library.remove_book(999).unwrap());

    let result = library.import_folder(&dir, "Book").unwrap();
    assert!(library.remove_book(result.book_id).unwrap());

    assert!(library.get_book(result.book_id).unwrap().is_none());
    assert!(db.list_pages(result.book_id).unwrap().is_empty());
    assert!(!library.remove_book(result.book_id).unwrap());

    // The catalog never owned the files.
    assert!(dir.join("1.jpg").exists());
    assert!(dir.join("2.jpg").exists());
}

#[test]
fn update_last_page_index_clamps_into_range() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg", "2.jpg", "3.jpg"]);
    let library = test_library();

    let result = library.import_folder(&dir, "Book").unwrap();

    library.update_last_page_index(result.book_id, 1).unwrap();
    assert_eq!(
        library.get_book(result.book_id).unwrap().unwrap().last_page_index,
        1
    );

    library.update_last_page_index(result.book_id, 999).unwrap();
    assert_eq!(
        library.get_book(result.book_id).unwrap().unwrap().last_page_index,
        2
    );

    library.update_last_page_index(result.book_id, -5).unwrap();
    assert_eq!(
        library.get_book(result.book_id).unwrap().unwrap().last_page_index,
        0
    );

    let err = library.update_last_page_index(999, 0).unwrap_err();
    assert!(matches!(err, AppError::BookNotFound(_)));
}

// ========== PAGE + COVER SERVING ==========

#[tokio::test]
async fn page_payload_carries_bytes_and_mime() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg", "2.png"]);
    let library = test_library();

    let result = library.import_folder(&dir, "Book").unwrap();
    let payload = library.get_page_payload(result.book_id, 1).await.unwrap();

    assert_eq!(payload.info.book_id, result.book_id);
    assert_eq!(payload.info.page_order, 1);
    assert_eq!(payload.info.mime_type, "image/png");
    assert_eq!(payload.bytes, b"bytes-of-2.png");
}

#[tokio::test]
async fn missing_page_and_missing_file_are_distinct_failures() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg", "2.jpg"]);
    let library = test_library();

    let result = library.import_folder(&dir, "Book").unwrap();

    let err = library.get_page_payload(result.book_id, 7).await.unwrap_err();
    assert!(matches!(err, AppError::PageNotFound { page_order: 7, .. }));

    fs::remove_file(dir.join("2.jpg")).unwrap();
    let err = library.get_page_payload(result.book_id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::FileUnavailable(_)));
}

#[tokio::test]
async fn thumbnail_returns_cover_bytes() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg", "2.jpg"]);
    let library = test_library();

    let result = library.import_folder(&dir, "Book").unwrap();
    let bytes = library.get_thumbnail(result.book_id).await.unwrap();
    assert_eq!(bytes, b"bytes-of-1.jpg");
}

#[tokio::test]
async fn thumbnail_absence_is_benign() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg"]);
    let library = test_library();

    // Unknown book: no error, just nothing to show.
    assert!(library.get_thumbnail(999).await.is_none());

    let result = library.import_folder(&dir, "Book").unwrap();
    fs::remove_file(dir.join("1.jpg")).unwrap();
    assert!(library.get_thumbnail(result.book_id).await.is_none());
}

#[tokio::test]
async fn cover_data_url_is_built_then_cached() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg"]);
    let library = test_library();

    let result = library.import_folder(&dir, "Book").unwrap();

    let url = library.cover_data_url(result.book_id).await.unwrap();
    assert!(url.starts_with("data:image/jpeg;base64,"));

    // Cached entries survive the file disappearing; staleness is accepted.
    fs::remove_file(dir.join("1.jpg")).unwrap();
    assert_eq!(library.cover_data_url(result.book_id).await, Some(url));
}

#[tokio::test]
async fn cover_data_url_missing_book_or_file_is_none() {
    let tmp = TempDir::new().unwrap();
    let dir = book_dir(tmp.path(), "book", &["1.jpg"]);
    let library = test_library();

    assert!(library.cover_data_url(999).await.is_none());

    let result = library.import_folder(&dir, "Book").unwrap();
    fs::remove_file(dir.join("1.jpg")).unwrap();
    assert!(library.cover_data_url(result.book_id).await.is_none());
}

// ========== CONFIG ==========

#[test]
fn config_parse_toml() {
    let toml = r#"
[database]
path = "/tmp/test.db"

[cache]
cover_capacity = 4
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.database.path, PathBuf::from("/tmp/test.db"));
    assert_eq!(config.cache.cover_capacity, 4);
}

#[test]
fn config_default_values() {
    let config = Config::default();
    assert_eq!(config.database.path, PathBuf::from("data/library.db"));
    assert_eq!(config.cache.cover_capacity, 10);
}
