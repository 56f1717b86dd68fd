//! Cipher helpers: AES-128-ECB with PKCS#7, AES-128-GCM, HMAC-SHA256, MD5 and CRC32.

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes_gcm::Aes128Gcm;
use aes_gcm::aead::{Aead, Payload};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;

use crate::error::{Error, Result};

pub(crate) const KEY_LEN: usize = 16;
pub(crate) const BLOCK_LEN: usize = 16;
pub(crate) const HMAC_LEN: usize = 32;

pub(crate) type Key = [u8; KEY_LEN];

type HmacSha256 = Hmac<Sha256>;

/// Encrypt with AES-128-ECB. With `pad`, PKCS#7 padding is applied; without it
/// the input must already be a whole number of blocks.
pub(crate) fn ecb_encrypt(key: &Key, plain: &[u8], pad: bool) -> Result<Vec<u8>> {
    let mut data = plain.to_vec();
    if pad {
        let n = BLOCK_LEN - plain.len() % BLOCK_LEN;
        data.extend(std::iter::repeat_n(n as u8, n));
    } else if data.len() % BLOCK_LEN != 0 {
        return Err(Error::Crypto(format!(
            "ECB input of {} bytes is not block aligned",
            data.len()
        )));
    }
    let cipher = Aes128::new(GenericArray::from_slice(key));
    for chunk in data.chunks_exact_mut(BLOCK_LEN) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }
    Ok(data)
}

/// Decrypt AES-128-ECB and strip PKCS#7 padding.
pub(crate) fn ecb_decrypt(key: &Key, data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() % BLOCK_LEN != 0 {
        return Err(Error::Crypto(format!(
            "ECB ciphertext of {} bytes is not block aligned",
            data.len()
        )));
    }
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut out = data.to_vec();
    for chunk in out.chunks_exact_mut(BLOCK_LEN) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }
    let n = out[out.len() - 1] as usize;
    if n == 0 || n > BLOCK_LEN || out[out.len() - n..].iter().any(|&b| b as usize != n) {
        return Err(Error::Crypto("bad PKCS#7 padding".into()));
    }
    out.truncate(out.len() - n);
    Ok(out)
}

/// Encrypt with AES-128-GCM. Returns `ciphertext || tag`.
pub(crate) fn gcm_encrypt(key: &Key, iv: &[u8; 12], aad: &[u8], plain: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes128Gcm::new(GenericArray::from_slice(key));
    cipher
        .encrypt(GenericArray::from_slice(iv), Payload { msg: plain, aad })
        .map_err(|_| Error::Crypto("GCM encryption failed".into()))
}

/// Decrypt `ciphertext || tag` with AES-128-GCM, verifying the tag.
pub(crate) fn gcm_decrypt(key: &Key, iv: &[u8], aad: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes128Gcm::new(GenericArray::from_slice(key));
    cipher
        .decrypt(GenericArray::from_slice(iv), Payload { msg: sealed, aad })
        .map_err(|_| Error::Crypto("GCM tag mismatch".into()))
}

pub(crate) fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; HMAC_LEN]> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).map_err(|e| Error::Crypto(e.to_string()))?;
    mac.update(data);
    let mut out = [0u8; HMAC_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Constant-time HMAC check.
pub(crate) fn verify_hmac(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    match <HmacSha256 as Mac>::new_from_slice(key) {
        Ok(mut mac) => {
            mac.update(data);
            mac.verify_slice(tag).is_ok()
        }
        Err(_) => false,
    }
}

/// Lowercase hex MD5 digest.
pub(crate) fn md5_hex(data: &[u8]) -> String {
    Md5::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
