//! Cryptography and DRM removal
//!
//! Both files of a book share one layout: the first 16 bytes are the CBC
//! initialization vector, the rest is AES-128-CBC ciphertext with PKCS#7
//! padding.
//!
//! # Key Chain
//! - **Device key**: first 16 UTF-8 bytes of the registered device id
//! - **Session key**: 16 ASCII bytes at offset 68..84 of the decrypted `.dat`
//! - **Content**: the book payload, decrypted with the session key

pub mod content;
pub mod key;

pub use content::{decrypt_content, is_valid_output, read_book_content};
pub use key::{device_key, extract_session_key, read_session_key, SessionKey};

use crate::error::{Result, RidiError};
use aes::Aes128;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};

/// Length of the IV prefix and of one AES block
pub const IV_LEN: usize = 16;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES-128-CBC decrypt and strip PKCS#7 padding
///
/// A key that is not exactly 16 bytes is reported as `DecryptFailed`.
pub fn decrypt_cbc(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes128CbcDec::new_from_slices(key, iv).map_err(|_| {
        RidiError::DecryptFailed(format!(
            "invalid key/IV length: key {} bytes, IV {} bytes",
            key.len(),
            iv.len()
        ))
    })?;

    let mut buffer = ciphertext.to_vec();
    let plaintext_len = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| RidiError::DecryptFailed("invalid PKCS#7 padding".into()))?
        .len();
    buffer.truncate(plaintext_len);

    Ok(buffer)
}


#[cfg(test)]
mod tests {
    use super::test_support::encrypt_cbc;
    use super::*;
    use rand::{Rng, RngCore};

    #[test]
    fn test_cbc_round_trip_random() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let mut key = [0u8; 16];
            let mut iv = [0u8; 16];
            rng.fill_bytes(&mut key);
            rng.fill_bytes(&mut iv);
            let len = rng.gen_range(0..200);
            let mut plaintext = vec![0u8; len];
            rng.fill_bytes(&mut plaintext);

            let ciphertext = encrypt_cbc(&key, &iv, &plaintext);
            assert_eq!(ciphertext.len() % 16, 0);
            assert_eq!(decrypt_cbc(&key, &iv, &ciphertext).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_decrypt_cbc_short_key() {
        let err = decrypt_cbc(b"short", &[0u8; 16], &[0u8; 16]).unwrap_err();
        assert!(matches!(err, RidiError::DecryptFailed(_)));
    }

    #[test]
    fn test_decrypt_cbc_bad_length() {
        let err = decrypt_cbc(&[1u8; 16], &[0u8; 16], &[0u8; 15]).unwrap_err();
        assert!(matches!(err, RidiError::DecryptFailed(_)));

        let err = decrypt_cbc(&[1u8; 16], &[0u8; 16], &[]).unwrap_err();
        assert!(matches!(err, RidiError::DecryptFailed(_)));
    }

    #[test]
    fn test_decrypt_cbc_block_aligned_plaintext() {
        // Block-aligned input gets a whole extra padding block
        let key = [7u8; 16];
        let iv = [9u8; 16];
        let ciphertext = encrypt_cbc(&key, &iv, &[0x10; 16]);
        let decrypted = decrypt_cbc(&key, &iv, &ciphertext).unwrap();
        assert_eq!(decrypted, vec![0x10; 16]);
    }
}
