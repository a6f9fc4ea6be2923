//! Batch export of a library
//!
//! Drives every book through key recovery, decryption, title lookup and
//! output, isolating failures per book.

pub mod batch;
pub mod progress;

// Re-export commonly used types
pub use batch::{
    decrypt_book, BatchExporter, BookFilter, DecryptedBook, ExportOutcome, ExportSummary,
    TitleScan,
};
pub use progress::{ExportProgress, ExportState, ProgressCallback};
