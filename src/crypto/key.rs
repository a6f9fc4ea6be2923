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


//! Session key recovery from the `.dat` sidecar
//!
//! # Sidecar Layout
//! ```text
//! [0, 16)    IV
//! [16, end)  AES-128-CBC(device key, IV) ciphertext, PKCS#7 padded
//! ```
//!
//! The decrypted sidecar is at least 84 bytes long; bytes `[68, 84)` are the
//! ASCII session key for the book payload.

use crate::auth::Credential;
use crate::book::{BookRecord, FileKind};
use crate::crypto::{decrypt_cbc, IV_LEN};
use crate::error::{Result, RidiError};
use log::debug;
use std::fs;

/// Offset of the session key inside the decrypted sidecar
pub const SESSION_KEY_OFFSET: usize = 68;

/// Session key length in bytes
pub const SESSION_KEY_LEN: usize = 16;

/// Minimum decrypted sidecar length
pub const MIN_SIDECAR_PLAINTEXT: usize = SESSION_KEY_OFFSET + SESSION_KEY_LEN;

/// 16-byte AES key for a book payload
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    /// Wrap raw bytes, rejecting anything but 16 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; SESSION_KEY_LEN] = bytes.try_into().map_err(|_| {
            RidiError::InvalidSessionKey(format!("expected 16 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// AES key material derived from the device id
///
/// The first 16 bytes of the UTF-8 encoded id. Shorter ids yield a shorter
/// slice, which the cipher rejects as `DecryptFailed`.
pub fn device_key(device_id: &str) -> &[u8] {
    let bytes = device_id.as_bytes();
    &bytes[..bytes.len().min(SESSION_KEY_LEN)]
}

/// Recover the session key from raw sidecar bytes
///
/// # Errors
/// - `TooShort` - fewer than 16 bytes (no room for the IV)
/// - `DecryptFailed` - bad device key length or padding
/// - `InvalidSessionKey` - plaintext shorter than 84 bytes, or the key region
///   is not 16 ASCII bytes
pub fn extract_session_key(sidecar: &[u8], credential: &Credential) -> Result<SessionKey> {
    if sidecar.len() < IV_LEN {
        return Err(RidiError::TooShort { len: sidecar.len() });
    }

    let (iv, ciphertext) = sidecar.split_at(IV_LEN);
    let plaintext = decrypt_cbc(device_key(&credential.device_id), iv, ciphertext)?;

    if plaintext.len() < MIN_SIDECAR_PLAINTEXT {
        return Err(RidiError::InvalidSessionKey(format!(
            "data plaintext too short: {} bytes",
            plaintext.len()
        )));
    }

    // Non-ASCII bytes are dropped, so any of them shortens the key
    let region = &plaintext[SESSION_KEY_OFFSET..MIN_SIDECAR_PLAINTEXT];
    let ascii: Vec<u8> = region.iter().copied().filter(u8::is_ascii).collect();

    SessionKey::from_slice(&ascii)
}

/// Read a book's sidecar and recover its session key
///
/// # Errors
/// `MissingSidecar` when the `.dat` file does not exist, otherwise as
/// [`extract_session_key`].
pub fn read_session_key(record: &BookRecord, credential: &Credential) -> Result<SessionKey> {
    let path = record.get_file(FileKind::Data);
    if !path.is_file() {
        return Err(RidiError::MissingSidecar { path });
    }

    let data = fs::read(&path)?;
    debug!("Data file: {} ({} bytes)", path.display(), data.len());

    let key = extract_session_key(&data, credential)?;
    debug!("Session key for {}: {}", record.id, key.to_hex());

    Ok(key)
}
