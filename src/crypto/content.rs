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


//! Book payload decryption
//!
//! Some titles ship without protection. Before touching the cipher the
//! payload's leading bytes are checked against the container signature; a
//! match means the file is already final and is returned as-is.

use crate::book::{BookFormat, BookRecord, FileKind};
use crate::crypto::{decrypt_cbc, SessionKey, IV_LEN};
use crate::error::{Result, RidiError};
use log::debug;
use std::fs;

/// Zip local file header, end of central directory, spanned archive marker
pub const ZIP_SIGNATURES: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Whether `data` already starts like a finished `format` file
pub fn is_valid_output(format: BookFormat, data: &[u8]) -> bool {
    match format {
        BookFormat::Epub => ZIP_SIGNATURES.iter().any(|sig| data.starts_with(sig)),
        BookFormat::Pdf => data.starts_with(PDF_SIGNATURE),
    }
}

/// Decrypt a book payload, or pass it through if it is already plain
///
/// # Errors
/// - `TooSmall` - under 16 bytes and not a valid book
/// - `DecryptFailed` - cipher or padding failure
pub fn decrypt_content(payload: Vec<u8>, key: &SessionKey, format: BookFormat) -> Result<Vec<u8>> {
    if is_valid_output(format, &payload) {
        debug!("Payload already a valid {}; returning as-is", format);
        return Ok(payload);
    }

    if payload.len() < IV_LEN {
        return Err(RidiError::TooSmall { len: payload.len() });
    }

    let (iv, ciphertext) = payload.split_at(IV_LEN);
    decrypt_cbc(key.as_bytes(), iv, ciphertext)
}

/// Read and decrypt a book's payload file
///
/// # Errors
/// `MissingBookFile` when the payload does not exist, otherwise as
/// [`decrypt_content`].
pub fn read_book_content(record: &BookRecord, key: &SessionKey) -> Result<Vec<u8>> {
    let path = record.get_file(FileKind::Book);
    if !path.is_file() {
        return Err(RidiError::MissingBookFile { path });
    }

    let raw = fs::read(&path)?;
    debug!("Book file: {} ({} bytes)", path.display(), raw.len());

    decrypt_content(raw, key, record.format)
}
