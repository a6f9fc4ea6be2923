//! Best-effort title extraction from decrypted books
//!
//! Nothing in here returns an error: a book whose metadata cannot be read
//! simply has no title and is written under its source file name.

pub mod epub;
#[cfg(feature = "pdf")]
pub mod pdf;

use crate::book::BookFormat;

/// Display title of a decrypted book, if one can be found
pub fn extract_title(format: BookFormat, content: &[u8]) -> Option<String> {
    let title = match format {
        BookFormat::Epub => epub::extract_title(content),
        BookFormat::Pdf => extract_pdf_title(content),
    };

    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(feature = "pdf")]
fn extract_pdf_title(content: &[u8]) -> Option<String> {
    pdf::extract_title(content)
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf_title(_content: &[u8]) -> Option<String> {
    None
}
