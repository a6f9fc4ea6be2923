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


//! Output file naming
//!
//! Titles come straight from book metadata and may contain anything. They are
//! made safe for every common filesystem, Windows included:
//! - `\ / : * ? " < > |` become spaces
//! - whitespace runs collapse to one space
//! - names are capped at 120 characters
//! - reserved device names (`CON`, `COM1`, ...) get a leading underscore

use crate::book::BookFormat;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Default cap on sanitized name length, in characters
pub const DEFAULT_MAX_LEN: usize = 120;

/// Highest `" (n)"` suffix tried before giving up
pub const MAX_COLLISION_INDEX: u32 = 999;

pub const UNTITLED: &str = "untitled";

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r#"[\\/:*?"<>|]"#).unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Whether `name` is a reserved Windows device name
pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Make a title safe to use as a file name (without extension)
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&replaced, " ");
    let mut result = collapsed.trim().to_string();

    if result.chars().count() > max_len {
        result = result.chars().take(max_len).collect::<String>().trim_end().to_string();
    }

    if is_reserved_name(&result) {
        result = format!("_{}", result);
    }

    if result.is_empty() {
        UNTITLED.to_string()
    } else {
        result
    }
}

/// File name for a decrypted book
///
/// `<sanitized title>.<ext>` when the book has a title, otherwise `fallback`
/// (the source file name).
pub fn output_file_name(title: Option<&str>, format: BookFormat, fallback: &str) -> String {
    match title {
        Some(title) => format!(
            "{}.{}",
            sanitize_filename(title, DEFAULT_MAX_LEN),
            format.extension()
        ),
        None => fallback.to_string(),
    }
}

/// Candidate path for collision index `n`; `0` is the name itself
///
/// `dir/Title.epub` becomes `dir/Title (n).epub`.
pub fn numbered_path(dir: &Path, file_name: &str, n: u32) -> PathBuf {
    if n == 0 {
        return dir.join(file_name);
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    match path.extension() {
        Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext.to_string_lossy())),
        None => dir.join(format!("{} ({})", stem, n)),
    }
}
