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


//! Batch export orchestration
//!
//! # Pipeline (per book)
//! 1. Recover the session key from the `.dat` sidecar
//! 2. Decrypt the payload (or pass it through if already plain)
//! 3. Extract a display title
//! 4. Write under the sanitized title, numbering on collision
//!
//! A failure at any stage is recorded against that book only; the batch
//! always runs to the end.
//!
//! # Filters
//! The id filter is an exact match and costs nothing. The title filter has to
//! decrypt every candidate to read its title; the decrypted content is kept
//! and reused for the export so no book is decrypted twice.

use crate::auth::Credential;
use crate::book::{BookFormat, BookRecord, FileKind};
use crate::crypto::{read_book_content, read_session_key};
use crate::error::Result;
use crate::export::progress::{ExportProgress, ExportState, ProgressCallback};
use crate::file::FileManager;
use crate::metadata::extract_title;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// A book after key recovery, decryption and title lookup
#[derive(Debug, Clone)]
pub struct DecryptedBook {
    pub record: BookRecord,
    pub content: Vec<u8>,
    pub title: Option<String>,
}

/// Run the read-side of the pipeline for one book
pub fn decrypt_book(record: &BookRecord, credential: &Credential) -> Result<DecryptedBook> {
    let key = read_session_key(record, credential)?;
    let content = read_book_content(record, &key)?;
    let title = extract_title(record.format, &content);

    Ok(DecryptedBook {
        record: record.clone(),
        content,
        title,
    })
}

/// Which books to process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// Exact book id
    pub id: Option<String>,

    /// Substring of the book title
    pub title: Option<String>,
}

impl BookFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            title: None,
        }
    }

    pub fn by_title(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: Some(title.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.title.is_none()
    }

    /// Apply the id filter and sort by id
    pub fn select(&self, mut records: Vec<BookRecord>) -> Vec<BookRecord> {
        if let Some(id) = &self.id {
            records.retain(|r| &r.id == id);
            if records.is_empty() {
                warn!("No books found with ID: {}", id);
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Whether a book with `title` passes the title filter
    pub fn matches_title(&self, title: Option<&str>) -> bool {
        match (&self.title, title) {
            (None, _) => true,
            (Some(needle), Some(title)) => title.contains(needle.as_str()),
            (Some(_), None) => false,
        }
    }

    /// Decrypt each book and report its title
    ///
    /// With a title filter only matching books are listed and unreadable books
    /// are left out; without one, unreadable books are listed with their error.
    pub fn scan_titles(&self, records: Vec<BookRecord>, credential: &Credential) -> Vec<TitleScan> {
        let records = self.select(records);
        info!("Scanning {} books for metadata...", records.len());

        records
            .into_iter()
            .filter_map(|record| match decrypt_book(&record, credential) {
                Ok(book) if self.matches_title(book.title.as_deref()) => Some(TitleScan {
                    book_id: record.id,
                    format: record.format,
                    title: book.title,
                    error: None,
                }),
                Ok(_) => None,
                Err(e) if self.title.is_none() => Some(TitleScan {
                    book_id: record.id,
                    format: record.format,
                    title: None,
                    error: Some(e.to_string()),
                }),
                Err(e) => {
                    warn!("Skipping {} during title scan: {}", record.id, e);
                    None
                }
            })
            .collect()
    }
}

/// Result for one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub book_id: String,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl ExportOutcome {
    pub fn succeeded(book_id: String, path: PathBuf) -> Self {
        Self {
            book_id,
            output_path: Some(path),
            error: None,
        }
    }

    pub fn failed(book_id: String, error: String) -> Self {
        Self {
            book_id,
            output_path: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.output_path.is_some()
    }
}

/// Aggregated batch result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    pub outcomes: Vec<ExportOutcome>,
}

impl ExportSummary {
    pub fn push(&mut self, outcome: ExportOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.total += 1;
        self.outcomes.push(outcome);
    }
}

/// One row of a library listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleScan {
    pub book_id: String,
    pub format: BookFormat,
    pub title: Option<String>,
    pub error: Option<String>,
}

/// Unit of work for the exporter
enum Job {
    Pending(BookRecord),
    Decrypted(DecryptedBook),
}

impl Job {
    fn record(&self) -> &BookRecord {
        match self {
            Job::Pending(record) => record,
            Job::Decrypted(book) => &book.record,
        }
    }
}

/// Runs the export pipeline over a set of books
#[derive(Clone)]
pub struct BatchExporter {
    credential: Credential,
    files: FileManager,
    filter: BookFilter,
    progress: Option<ProgressCallback>,
}

impl BatchExporter {
    pub fn new(credential: Credential, files: FileManager) -> Self {
        Self {
            credential,
            files,
            filter: BookFilter::default(),
            progress: None,
        }
    }

    pub fn with_filter(mut self, filter: BookFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Export `records` one after another
    pub fn run(&self, records: Vec<BookRecord>) -> ExportSummary {
        let jobs = self.prepare(records);
        let total = jobs.len();

        let mut summary = ExportSummary::default();
        for (index, job) in jobs.into_iter().enumerate() {
            summary.push(self.process(job, index, total));
        }
        summary
    }

    /// Export `records` with at most `workers` books in flight
    ///
    /// Outcomes are reported in the same order as [`run`](Self::run).
    pub async fn run_parallel(&self, records: Vec<BookRecord>, workers: usize) -> ExportSummary {
        let this = self.clone();
        let jobs = match tokio::task::spawn_blocking(move || this.prepare(records)).await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!("Title scan aborted: {}", e);
                return ExportSummary::default();
            }
        };

        let total = jobs.len();
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));

        let mut handles = Vec::with_capacity(total);
        for (index, job) in jobs.into_iter().enumerate() {
            let book_id = job.record().id.clone();
            let semaphore = Arc::clone(&semaphore);
            let this = self.clone();

            let handle = tokio::spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail
                let _permit = semaphore.acquire_owned().await.ok();
                tokio::task::spawn_blocking(move || this.process(job, index, total)).await
            });
            handles.push((book_id, handle));
        }

        let mut summary = ExportSummary::default();
        for (book_id, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) | Err(e) => {
                    error!("Worker for {} aborted: {}", book_id, e);
                    ExportOutcome::failed(book_id, format!("worker aborted: {}", e))
                }
            };
            summary.push(outcome);
        }
        summary
    }

    /// Apply filters; the title filter decrypts every remaining candidate
    fn prepare(&self, records: Vec<BookRecord>) -> Vec<Job> {
        let records = self.filter.select(records);

        if self.filter.title.is_none() {
            return records.into_iter().map(Job::Pending).collect();
        }

        info!("Scanning books to match title...");
        records
            .iter()
            .filter_map(|record| match decrypt_book(record, &self.credential) {
                Ok(book) if self.filter.matches_title(book.title.as_deref()) => {
                    Some(Job::Decrypted(book))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!("Skipping {} during title scan: {}", record.id, e);
                    None
                }
            })
            .collect()
    }

    fn process(&self, job: Job, index: usize, total: usize) -> ExportOutcome {
        let record = job.record().clone();
        let file_name = record.file_name(FileKind::Book);

        let mut progress = ExportProgress::new(record.id.clone(), file_name.clone(), index, total);
        progress.set_state(ExportState::Decrypting);
        self.report(&progress);

        let book = match job {
            Job::Pending(record) => decrypt_book(&record, &self.credential),
            Job::Decrypted(book) => Ok(book),
        };
        let written = book.and_then(|book| {
            self.files
                .write_book(&book.content, book.title.as_deref(), record.format, &file_name)
        });

        match written {
            Ok(path) => {
                info!("Decrypted \"{}\" -> {}", file_name, path.display());
                progress.set_completed(path.clone());
                self.report(&progress);
                ExportOutcome::succeeded(record.id, path)
            }
            Err(e) => {
                error!("Error decrypting {}: {}", record.id, e);
                progress.set_error(e.to_string());
                self.report(&progress);
                ExportOutcome::failed(record.id, e.to_string())
            }
        }
    }

    fn report(&self, progress: &ExportProgress) {
        if let Some(callback) = &self.progress {
            callback(progress.clone());
        }
    }
}
