//! mangashelf: a local manga/comic library core.
//!
//! This crate imports folders of loose page images as "books", keeps the
//! catalog in an embedded SQLite store, and serves page bytes with MIME
//! inference to a reader front-end.
//!
//! # Features
//!
//! - Deterministic natural-sort page ordering (2.png before 10.jpeg)
//! - Transactional import: book upsert and page replacement commit together
//! - Idempotent re-import keyed on folder path
//! - Explicit overwrite flow that resets reading progress
//! - Per-book reading progress persistence
//! - Cover thumbnails as base64 data URLs behind a bounded cache

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration and CLI.
pub mod config;
/// Cover data URLs and the bounded cover cache.
pub mod cover;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Image format and MIME detection.
pub mod formats;
/// Library orchestration: import, overwrite, page serving.
pub mod library;
/// Folder scanning and page ordering.
pub mod scanner;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use library::LibraryService;
