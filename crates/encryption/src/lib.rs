//! AES-256-CBC helpers for packaging datasets.
//!
//! An encrypted payload is the 16-byte IV followed by the PKCS#7-padded
//! ciphertext. Keys travel as base64 so they can be pushed to the SMS as-is.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use iexec_core::SdkError;
use rand::RngCore;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;

/// A fresh random key, base64 encoded.
pub fn generate_aes256_key() -> String {
    let mut key = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    base64::engine::general_purpose::STANDARD.encode(key)
}

fn decode_key(base64_key: &str) -> Result<[u8; KEY_LEN], SdkError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(base64_key.trim())
        .map_err(|e| SdkError::validation("key", format!("not valid base64: {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        SdkError::validation(
            "key",
            format!("expected {KEY_LEN} bytes, got {}", bytes.len()),
        )
    })
}

/// Encrypts `plaintext` under a random IV and returns `IV ‖ ciphertext`.
pub fn encrypt_aes256_cbc(plaintext: &[u8], base64_key: &str) -> Result<Vec<u8>, SdkError> {
    let key = decode_key(base64_key)?;
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext =
        Aes256CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt_aes256_cbc(encrypted: &[u8], base64_key: &str) -> Result<Vec<u8>, SdkError> {
    let key = decode_key(base64_key)?;
    if encrypted.len() < IV_LEN * 2 || (encrypted.len() - IV_LEN) % IV_LEN != 0 {
        return Err(SdkError::validation(
            "encrypted",
            format!("{} bytes is not an IV followed by whole blocks", encrypted.len()),
        ));
    }
    let (iv, ciphertext) = encrypted.split_at(IV_LEN);
    let mut iv_block = [0u8; IV_LEN];
    iv_block.copy_from_slice(iv);

    Aes256CbcDec::new(&key.into(), &iv_block.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| SdkError::validation("key", "decryption failed, wrong key or corrupted data"))
}
