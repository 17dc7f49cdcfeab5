use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Local manga library manager.
#[derive(Parser, Debug, Clone)]
#[command(name = "mangashelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "MANGASHELF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Initialize database and create default config.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },

    /// Import an image folder as a book.
    Import {
        /// Folder containing page images.
        path: PathBuf,

        /// Book title (defaults to the folder name).
        #[arg(short, long)]
        title: Option<String>,

        /// Overwrite an already-registered folder, resetting reading
        /// progress.
        #[arg(long)]
        overwrite: bool,
    },

    /// List registered books.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// Sort order: newest, title, title-desc, created, created-desc.
        #[arg(long, default_value = "newest")]
        sort: String,
    },

    /// Rename a book.
    Rename {
        /// Book id.
        id: i64,
        /// New title.
        title: String,
    },

    /// Remove a book from the catalog (image files stay on disk).
    Remove {
        /// Book id.
        id: i64,
    },

    /// Write one page's image bytes to a file or stdout.
    Page {
        /// Book id.
        book_id: i64,
        /// Zero-based page order.
        page_order: i64,
        /// Output file (stdout if omitted).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/library.db")
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of cover data URLs kept in memory.
    #[serde(default = "default_cover_capacity")]
    pub cover_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cover_capacity: default_cover_capacity(),
        }
    }
}

fn default_cover_capacity() -> usize {
    10
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("mangashelf.toml"),
            dirs::config_dir()
                .map(|p| p.join("mangashelf").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/mangashelf/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# mangashelf configuration

[database]
# path = "data/library.db"

[cache]
# Number of cover data URLs kept in memory
cover_capacity = 10
"#
        .to_string()
    }
}
