//! Ridibooks DRM removal
//!
//! Decrypts books downloaded by the Ridibooks reader app into plain EPUB and
//! PDF files named after their titles.
//!
//! ```rust,no_run
//! use ridi_core::{auth::Credential, book, export::BatchExporter, file::FileManager};
//! use std::path::Path;
//!
//! # fn main() -> ridi_core::Result<()> {
//! let credential = Credential::new("4242", "a1b2c3d4-e5f6-4789-abcd-ef0123456789");
//! let records = book::available_books(Path::new("/path/to/library/_4242"));
//! let exporter = BatchExporter::new(credential, FileManager::new("out")?);
//! let summary = exporter.run(records);
//! println!("{}/{} exported", summary.succeeded, summary.total);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod error;
pub mod auth;
pub mod book;
pub mod crypto;
pub mod metadata;
pub mod file;
pub mod export;
pub mod storage;

// Re-export commonly used types for convenience
pub use error::{Result, RidiError};
pub use auth::Credential;
pub use book::{BookFormat, BookRecord, FileKind};
pub use export::{BatchExporter, BookFilter, ExportSummary};
