// RidiSync - Ridibooks Library Export
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Library location and discovery
//!
//! # Library Layout
//! ```text
//! <library root>/
//!   <book id>/
//!     <book id>.epub | <book id>.pdf   (encrypted payload)
//!     <book id>.dat                    (encrypted session key)
//! ```
//!
//! The reader app keeps one library per user:
//! - macOS: `~/Library/Application Support/Ridibooks/library/_<user_idx>`
//! - Windows: `%APPDATA%\Ridibooks\library\_<user_idx>`

use crate::book::BookRecord;
use crate::error::{Result, RidiError};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve the reader app's library directory for a user
///
/// # Errors
/// `UnsupportedPlatform` on anything but macOS and Windows, or when the home /
/// application data directory cannot be determined.
pub fn library_path(user_idx: &str) -> Result<PathBuf> {
    let user_dir = format!("_{}", user_idx);

    if cfg!(target_os = "macos") {
        let home = dirs::home_dir()
            .ok_or_else(|| RidiError::UnsupportedPlatform("home directory not found".into()))?;
        return Ok(home
            .join("Library")
            .join("Application Support")
            .join("Ridibooks")
            .join("library")
            .join(user_dir));
    }

    if cfg!(target_os = "windows") {
        // Roaming application data, i.e. %APPDATA%
        let appdata = dirs::config_dir()
            .filter(|p| p.exists())
            .ok_or_else(|| RidiError::UnsupportedPlatform("APPDATA environment variable not found".into()))?;
        return Ok(appdata.join("Ridibooks").join("library").join(user_dir));
    }

    Err(RidiError::UnsupportedPlatform(std::env::consts::OS.to_string()))
}

/// Scan `root` for book directories
///
/// Subdirectories without a recognized book file are skipped. A missing root
/// yields an empty list. Records are sorted by id.
pub fn discover(root: &Path) -> Vec<BookRecord> {
    if !root.exists() {
        warn!("Library path not found: {}", root.display());
        return Vec::new();
    }

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read library {}: {}", root.display(), e);
            return Vec::new();
        }
    };

    let mut records: Vec<BookRecord> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let record = BookRecord::from_dir(&path);
            if record.is_none() {
                debug!("Skipping {}: no book file", path.display());
            }
            record
        })
        .collect();

    records.sort_by(|a, b| a.id.cmp(&b.id));
    records
}

/// Books that carry a `.dat` sidecar and can therefore be decrypted
pub fn available_books(root: &Path) -> Vec<BookRecord> {
    discover(root)
        .into_iter()
        .filter(|record| {
            let ok = record.has_sidecar();
            if !ok {
                debug!("Skipping {}: no data file", record.id);
            }
            ok
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookFormat;
    use tempfile::TempDir;

    fn book_dir(root: &Path, id: &str, ext: &str, with_dat: bool) {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.{}", id, ext)), b"payload").unwrap();
        if with_dat {
            fs::write(dir.join(format!("{}.dat", id)), b"sidecar").unwrap();
        }
    }

    #[test]
    fn test_discover_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(&tmp.path().join("nope")).is_empty());
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        book_dir(tmp.path(), "300", "pdf", true);
        book_dir(tmp.path(), "100", "epub", true);
        book_dir(tmp.path(), "200", "txt", true);
        fs::write(tmp.path().join("stray.epub"), b"not a directory").unwrap();

        let records = discover(tmp.path());
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["100", "300"]);
        assert_eq!(records[0].format, BookFormat::Epub);
        assert_eq!(records[1].format, BookFormat::Pdf);
    }

    #[test]
    fn test_available_books_requires_sidecar() {
        let tmp = TempDir::new().unwrap();
        book_dir(tmp.path(), "1", "epub", true);
        book_dir(tmp.path(), "2", "epub", false);

        let records = available_books(tmp.path());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
    }

    #[test]
    fn test_library_path_shape() {
        match library_path("12345") {
            Ok(path) => {
                assert!(path.ends_with("_12345"));
                assert!(path.to_string_lossy().contains("Ridibooks"));
            }
            Err(e) => assert!(matches!(e, RidiError::UnsupportedPlatform(_))),
        }
    }
}
