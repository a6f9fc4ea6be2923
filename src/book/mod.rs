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


//! Book records and library discovery
//!
//! A Ridibooks library is a directory with one subdirectory per book. Each
//! book directory holds the encrypted payload (`<id>.epub` or `<id>.pdf`) and
//! the `<id>.dat` sidecar carrying the encrypted session key.

pub mod library;

pub use library::{available_books, discover, library_path};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Container format of a book payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    /// Zip-based ebook
    Epub,
    /// Page-based document
    Pdf,
}

impl BookFormat {
    /// Classify a file by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "epub" => Some(BookFormat::Epub),
            "pdf" => Some(BookFormat::Pdf),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            BookFormat::Epub => "epub",
            BookFormat::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for BookFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BookFormat::Epub => "EPUB",
            BookFormat::Pdf => "PDF",
        })
    }
}

/// Which file of a book directory to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Encrypted payload
    Book,
    /// `.dat` sidecar with the encrypted session key
    Data,
}

/// One book discovered in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Source directory name
    pub id: String,

    /// Book directory
    pub root_path: PathBuf,

    pub format: BookFormat,
}

impl BookRecord {
    /// Build a record from a book directory
    ///
    /// Returns `None` when the directory holds no recognized book file.
    pub fn from_dir(path: &Path) -> Option<Self> {
        let id = path.file_name()?.to_str()?.to_string();

        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let format = files.iter().find_map(|p| BookFormat::from_path(p))?;

        Some(Self {
            id,
            root_path: path.to_path_buf(),
            format,
        })
    }

    fn extension_for(&self, kind: FileKind) -> &'static str {
        match kind {
            FileKind::Book => self.format.extension(),
            FileKind::Data => "dat",
        }
    }

    /// Locate `<id>.<ext>` inside the book directory
    ///
    /// Matching is case-insensitive. If nothing matches, the synthesized path
    /// `<root>/<id>.<ext>` is returned so callers can report it.
    pub fn get_file(&self, kind: FileKind) -> PathBuf {
        let wanted = format!("{}.{}", self.id, self.extension_for(kind));

        if let Ok(entries) = fs::read_dir(&self.root_path) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                let matches = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.eq_ignore_ascii_case(&wanted))
                    .unwrap_or(false);
                if matches && path.is_file() {
                    return path;
                }
            }
        }

        self.root_path.join(wanted)
    }

    /// Bare file name for `kind`
    pub fn file_name(&self, kind: FileKind) -> String {
        match kind {
            FileKind::Book => format!("{}.{}", self.id, self.format.extension()),
            FileKind::Data => self
                .get_file(kind)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{}.dat", self.id)),
        }
    }

    /// Whether the sidecar exists on disk
    pub fn has_sidecar(&self) -> bool {
        self.get_file(FileKind::Data).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(BookFormat::from_path(Path::new("a/1.epub")), Some(BookFormat::Epub));
        assert_eq!(BookFormat::from_path(Path::new("1.PDF")), Some(BookFormat::Pdf));
        assert_eq!(BookFormat::from_path(Path::new("1.dat")), None);
        assert_eq!(BookFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_record_from_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("1234");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("1234.dat"), b"x").unwrap();
        fs::write(dir.join("1234.epub"), b"x").unwrap();

        let record = BookRecord::from_dir(&dir).unwrap();
        assert_eq!(record.id, "1234");
        assert_eq!(record.format, BookFormat::Epub);
        assert_eq!(record.file_name(FileKind::Book), "1234.epub");
    }

    #[test]
    fn test_record_without_book_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("999");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("999.dat"), b"x").unwrap();

        assert!(BookRecord::from_dir(&dir).is_none());
    }

    #[test]
    fn test_get_file_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("42");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("42.PDF"), b"x").unwrap();
        fs::write(dir.join("42.DAT"), b"x").unwrap();

        let record = BookRecord::from_dir(&dir).unwrap();
        assert_eq!(record.get_file(FileKind::Book), dir.join("42.PDF"));
        assert_eq!(record.get_file(FileKind::Data), dir.join("42.DAT"));
        assert!(record.has_sidecar());
    }

    #[test]
    fn test_get_file_synthesized_default() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("7");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("other.epub"), b"x").unwrap();

        let record = BookRecord::from_dir(&dir).unwrap();
        assert_eq!(record.get_file(FileKind::Book), dir.join("7.epub"));
        assert_eq!(record.get_file(FileKind::Data), dir.join("7.dat"));
        assert!(!record.has_sidecar());
    }
}
