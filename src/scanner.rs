//! Folder scanning and page ordering.

use crate::error::{AppError, Result};
use crate::formats::ImageFormat;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List the page images directly inside `folder`, in reading order.
///
/// Only regular files with a `.jpg`/`.jpeg`/`.png` extension
/// (case-insensitive) are kept; everything else is ignored. File names are
/// ordered by [`natural_cmp`], which is the page ordering contract. Every call
/// re-reads the directory, so the result always reflects current disk
/// contents.
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(AppError::DirectoryNotFound(folder.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .and_then(ImageFormat::from_extension)
                .is_some_and(|f| f.importable())
        })
        .map(|e| e.into_path())
        .collect();

    if files.is_empty() {
        return Err(AppError::NoImagesFound(folder.to_path_buf()));
    }

    files.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));

    tracing::debug!(folder = %folder.display(), pages = files.len(), "Scanned folder");
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Natural string comparison for page ordering (so `2.png` comes before
/// `10.jpeg`).
///
/// Runs of ASCII digits compare numerically, all other characters compare
/// case-insensitively; digit handling is locale-independent. A full tie falls
/// back to byte order so the ordering is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ac), Some(bc)) if ac.is_ascii_digit() && bc.is_ascii_digit() => {
                let a_val = take_number(&mut a_chars);
                let b_val = take_number(&mut b_chars);
                match a_val.cmp(&b_val) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            (Some(ac), Some(bc)) => {
                a_chars.next();
                b_chars.next();
                match ac.to_ascii_lowercase().cmp(&bc.to_ascii_lowercase()) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
        }
    }
}

/// Consume a run of ASCII digits, saturating instead of overflowing.
fn take_number(chars: &mut Peekable<std::str::Chars<'_>>) -> u128 {
    let mut value: u128 = 0;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(u128::from(digit));
        chars.next();
    }
    value
}
