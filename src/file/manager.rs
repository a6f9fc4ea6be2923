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


//! Output directory management
//!
//! Every book is written whole to a temporary file inside the output
//! directory and then moved to its final name with no-clobber semantics. The
//! move either claims a free name or fails with `AlreadyExists`, so:
//! - an existing file is never overwritten
//! - concurrent writers never share a name
//! - an interrupted run leaves no half-written file under a final name

use crate::book::BookFormat;
use crate::error::{Result, RidiError};
use crate::file::paths::{numbered_path, output_file_name, MAX_COLLISION_INDEX};
use log::debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes decrypted books into one output directory
#[derive(Debug, Clone)]
pub struct FileManager {
    output_dir: PathBuf,
}

impl FileManager {
    /// Use `output_dir`, creating it if needed
    ///
    /// # Errors
    /// `OutputDirectory` if the directory cannot be created or is a file.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();

        fs::create_dir_all(&output_dir).map_err(|source| RidiError::OutputDirectory {
            path: output_dir.clone(),
            source,
        })?;

        if !output_dir.is_dir() {
            return Err(RidiError::OutputDirectory {
                path: output_dir,
                source: std::io::Error::new(ErrorKind::Other, "not a directory"),
            });
        }

        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `content` as `file_name`, numbering the name on collision
    ///
    /// Tries `file_name`, then `stem (1).ext` up to `stem (999).ext`.
    ///
    /// # Errors
    /// - `CollisionCeilingExceeded` - every candidate name is taken
    /// - `Io` - the temporary file cannot be written or moved
    pub fn write(&self, content: &[u8], file_name: &str) -> Result<PathBuf> {
        let mut temp = NamedTempFile::new_in(&self.output_dir)?;
        temp.write_all(content)?;
        temp.as_file().sync_all()?;

        for n in 0..=MAX_COLLISION_INDEX {
            let candidate = numbered_path(&self.output_dir, file_name, n);
            if candidate.exists() {
                continue;
            }

            match temp.persist_noclobber(&candidate) {
                Ok(_) => {
                    debug!("Wrote output: {}", candidate.display());
                    return Ok(candidate);
                }
                // Claimed by another writer in the meantime
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => temp = e.file,
                Err(e) => return Err(e.error.into()),
            }
        }

        Err(RidiError::CollisionCeilingExceeded {
            path: self.output_dir.join(file_name),
        })
    }

    /// Write a decrypted book under its title, or `fallback` if untitled
    pub fn write_book(
        &self,
        content: &[u8],
        title: Option<&str>,
        format: BookFormat,
        fallback: &str,
    ) -> Result<PathBuf> {
        self.write(content, &output_file_name(title, format, fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_output_dir() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("a").join("b");
        let manager = FileManager::new(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(manager.output_dir(), out.as_path());
    }

    #[test]
    fn test_output_dir_is_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("taken");
        fs::write(&file, b"x").unwrap();
        let err = FileManager::new(&file).unwrap_err();
        assert!(matches!(err, RidiError::OutputDirectory { .. }));
    }

    #[test]
    fn test_collision_numbering() {
        let tmp = TempDir::new().unwrap();
        let manager = FileManager::new(tmp.path()).unwrap();

        let first = manager.write(b"one", "title.epub").unwrap();
        let second = manager.write(b"two", "title.epub").unwrap();
        let third = manager.write(b"three", "title.epub").unwrap();

        assert_eq!(first, tmp.path().join("title.epub"));
        assert_eq!(second, tmp.path().join("title (1).epub"));
        assert_eq!(third, tmp.path().join("title (2).epub"));
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
    }

    #[test]
    fn test_collision_ceiling() {
        let tmp = TempDir::new().unwrap();
        let manager = FileManager::new(tmp.path()).unwrap();

        fs::write(tmp.path().join("full.pdf"), b"").unwrap();
        for n in 1..=MAX_COLLISION_INDEX {
            fs::write(tmp.path().join(format!("full ({}).pdf", n)), b"").unwrap();
        }

        let err = manager.write(b"data", "full.pdf").unwrap_err();
        assert!(matches!(err, RidiError::CollisionCeilingExceeded { .. }));

        // Nothing left behind besides the pre-existing files
        let count = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(count, 1 + MAX_COLLISION_INDEX as usize);
    }

    #[test]
    fn test_write_book_names() {
        let tmp = TempDir::new().unwrap();
        let manager = FileManager::new(tmp.path()).unwrap();

        let titled = manager
            .write_book(b"x", Some("CON"), BookFormat::Pdf, "1.pdf")
            .unwrap();
        assert_eq!(titled, tmp.path().join("_CON.pdf"));

        let untitled = manager.write_book(b"x", None, BookFormat::Epub, "2.epub").unwrap();
        assert_eq!(untitled, tmp.path().join("2.epub"));
    }
}
