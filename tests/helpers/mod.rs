//! Test helpers for library fixtures
//!
//! Builds on-disk libraries the way the reader app lays them out:
//! `<root>/<book_id>/<book_id>.{epub,pdf,dat}`, with the sidecar sealed under
//! the device key and the payload sealed under the session key.

#![allow(dead_code)]

use aes::Aes128;
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use ridi_core::Credential;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;

pub const USER_IDX: &str = "4242";
pub const DEVICE_ID: &str = "a1b2c3d4-e5f6-4789-abcd-ef0123456789";

pub fn credential() -> Credential {
    Credential::new(USER_IDX, DEVICE_ID)
}

/// AES-128-CBC with PKCS#7, prefixed by the IV
pub fn seal(key: &[u8], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; plaintext.len() + 16];
    buffer[..plaintext.len()].copy_from_slice(plaintext);
    let len = Aes128CbcEnc::new_from_slices(key, iv)
        .unwrap()
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext.len())
        .unwrap()
        .len();
    buffer.truncate(len);

    let mut out = iv.to_vec();
    out.extend_from_slice(&buffer);
    out
}

/// Sidecar bytes carrying `session_key` at offset 68
pub fn sidecar(session_key: &[u8; 16]) -> Vec<u8> {
    let mut plaintext = vec![b'x'; 68];
    plaintext.extend_from_slice(session_key);
    plaintext.extend_from_slice(b"trailing-bytes");
    seal(&DEVICE_ID.as_bytes()[..16], &[0x11; 16], &plaintext)
}

/// Minimal EPUB whose package document carries `title`
pub fn epub_with_title(title: &str) -> Vec<u8> {
    build_epub(title, None)
}

/// EPUB titled `title` with an extra text entry, so same-titled books differ
pub fn epub_with_note(title: &str, note: &str) -> Vec<u8> {
    build_epub(title, Some(note))
}

fn build_epub(title: &str, note: Option<&str>) -> Vec<u8> {
    let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
    let opf = format!(
        r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{}</dc:title>
  </metadata>
</package>"#,
        title
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, body) in [
        ("mimetype", "application/epub+zip"),
        ("META-INF/container.xml", container),
        ("OEBPS/content.opf", opf.as_str()),
    ] {
        writer.start_file(name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    if let Some(note) = note {
        writer.start_file("OEBPS/note.txt", options).unwrap();
        writer.write_all(note.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A library directory under construction
pub struct LibraryBuilder {
    root: PathBuf,
}

impl LibraryBuilder {
    pub fn new(root: &Path) -> Self {
        fs::create_dir_all(root).unwrap();
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn book_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Encrypted EPUB titled `title`
    pub fn add_epub(&self, id: &str, title: &str, session_key: &[u8; 16]) -> &Self {
        self.add_encrypted(id, "epub", &epub_with_title(title), session_key)
    }

    /// Encrypted PDF-like payload; only the signature matters to the pipeline
    pub fn add_pdf(&self, id: &str, body: &[u8], session_key: &[u8; 16]) -> &Self {
        let mut content = b"%PDF-1.4\n".to_vec();
        content.extend_from_slice(body);
        self.add_encrypted(id, "pdf", &content, session_key)
    }

    /// EPUB stored without encryption next to a valid sidecar
    pub fn add_plain_epub(&self, id: &str, title: &str, session_key: &[u8; 16]) -> &Self {
        self.write(id, "epub", &epub_with_title(title));
        self.write(id, "dat", &sidecar(session_key));
        self
    }

    pub fn add_encrypted(&self, id: &str, ext: &str, content: &[u8], session_key: &[u8; 16]) -> &Self {
        self.write(id, ext, &seal(session_key, &[0x22; 16], content));
        self.write(id, "dat", &sidecar(session_key));
        self
    }

    /// Overwrite a file of book `id`
    pub fn write(&self, id: &str, ext: &str, bytes: &[u8]) {
        let dir = self.book_dir(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.{}", id, ext)), bytes).unwrap();
    }
}
