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


//! Export progress reporting
//!
//! The batch exporter emits one [`ExportProgress`] when a book starts and one
//! when it completes or fails. Presentation is up to the callback.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Per-book progress report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportProgress {
    /// Book id (source directory name)
    pub book_id: String,

    /// Source book file name, e.g. `123456.epub`
    pub file_name: String,

    /// Zero-based position in the batch
    pub index: usize,

    /// Number of books in the batch
    pub total: usize,

    pub state: ExportState,

    /// Where the decrypted book was written
    pub output_path: Option<PathBuf>,

    /// Error message if the book failed
    pub error_message: Option<String>,
}

impl ExportProgress {
    /// Create a queued progress report
    pub fn new(book_id: String, file_name: String, index: usize, total: usize) -> Self {
        Self {
            book_id,
            file_name,
            index,
            total,
            state: ExportState::Queued,
            output_path: None,
            error_message: None,
        }
    }

    pub fn set_state(&mut self, state: ExportState) {
        self.state = state;
    }

    /// Mark as written to `path`
    pub fn set_completed(&mut self, path: PathBuf) {
        self.state = ExportState::Completed;
        self.output_path = Some(path);
    }

    /// Set error message and mark as failed
    pub fn set_error(&mut self, error: String) {
        self.state = ExportState::Failed;
        self.error_message = Some(error);
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, ExportState::Completed | ExportState::Failed)
    }

    /// Batch position as a fraction (0.0 - 1.0), counting this book as done
    /// once finished
    pub fn as_fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let done = self.index + usize::from(self.is_finished());
        done as f64 / self.total as f64
    }
}

/// Progress callback
///
/// Uses Arc instead of Box to enable Clone trait
pub type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Per-book export state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportState {
    /// Waiting to be processed
    Queued,
    /// Key recovery and decryption in progress
    Decrypting,
    /// Written to the output directory
    Completed,
    /// Failed with error
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_progress_new() {
        let progress = ExportProgress::new("100".into(), "100.epub".into(), 0, 4);
        assert_eq!(progress.state, ExportState::Queued);
        assert!(progress.output_path.is_none());
        assert!(!progress.is_finished());
        assert_eq!(progress.as_fraction(), 0.0);
    }

    #[test]
    fn test_export_progress_completed() {
        let mut progress = ExportProgress::new("100".into(), "100.epub".into(), 1, 4);
        progress.set_completed(PathBuf::from("/out/Book.epub"));
        assert_eq!(progress.state, ExportState::Completed);
        assert!(progress.is_finished());
        assert_eq!(progress.as_fraction(), 0.5);
    }

    #[test]
    fn test_export_progress_error() {
        let mut progress = ExportProgress::new("100".into(), "100.epub".into(), 3, 4);
        progress.set_error("Decryption failed".into());
        assert_eq!(progress.state, ExportState::Failed);
        assert_eq!(progress.error_message.as_deref(), Some("Decryption failed"));
        assert_eq!(progress.as_fraction(), 1.0);
    }

    #[test]
    fn test_empty_batch_fraction() {
        let progress = ExportProgress::new(String::new(), String::new(), 0, 0);
        assert_eq!(progress.as_fraction(), 0.0);
    }
}
