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


//! Error types for the export pipeline
//!
//! Errors fall into two groups:
//! - **Per-book** errors (missing sidecar, bad key, cipher failure, naming
//!   collisions). The batch exporter records these against the offending book
//!   and keeps going.
//! - **Boundary** errors (missing library, unwritable output directory, no
//!   active account). These abort the current command.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, RidiError>;

#[derive(Debug, Error)]
pub enum RidiError {
    // ------------------------------------------------------------------
    // Per-book errors
    // ------------------------------------------------------------------
    /// The `.dat` sidecar does not exist
    #[error("Missing data file: {}", path.display())]
    MissingSidecar { path: PathBuf },

    /// The book payload does not exist
    #[error("Book file not found: {}", path.display())]
    MissingBookFile { path: PathBuf },

    /// Sidecar is shorter than one IV
    #[error("Data file too short: {len} bytes")]
    TooShort { len: usize },

    /// Payload is shorter than one IV and not already a valid book
    #[error("Book file too small to contain IV: {len} bytes")]
    TooSmall { len: usize },

    /// Cipher construction or PKCS#7 unpadding failed
    #[error("Decryption failed: {0}")]
    DecryptFailed(String),

    /// Sidecar plaintext did not yield a 16-byte session key
    #[error("Invalid session key: {0}")]
    InvalidSessionKey(String),

    /// No free output name between " (1)" and " (999)"
    #[error("No free file name for {} after 999 attempts", path.display())]
    CollisionCeilingExceeded { path: PathBuf },

    // ------------------------------------------------------------------
    // Boundary errors
    // ------------------------------------------------------------------
    #[error("Library path not found: {}", path.display())]
    LibraryNotFound { path: PathBuf },

    #[error("No books found in library")]
    NoBooksFound,

    #[error("Cannot use output directory {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Library location is not known on this platform: {0}")]
    UnsupportedPlatform(String),

    #[error("No active user. Please login first.")]
    NoActiveUser,

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RidiError {
    /// Whether this error belongs to a single book rather than the whole run
    pub fn is_per_book(&self) -> bool {
        matches!(
            self,
            RidiError::MissingSidecar { .. }
                | RidiError::MissingBookFile { .. }
                | RidiError::TooShort { .. }
                | RidiError::TooSmall { .. }
                | RidiError::DecryptFailed(_)
                | RidiError::InvalidSessionKey(_)
                | RidiError::CollisionCeilingExceeded { .. }
                | RidiError::Io(_)
        )
    }
}
