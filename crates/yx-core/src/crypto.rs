//! Cryptographic primitives for YX.
//!
//! Three stateless operations:
//!   1. HMAC-SHA-256 truncated to 16 bytes — per-packet authentication
//!   2. AES-256-GCM — message-level sealing as `nonce(12) ‖ ct ‖ tag(16)`
//!   3. Raw DEFLATE — message-level compression
//!
//! The AEAD frame layout must stay bit-identical across implementations.
//! Nonces come from the thread-local CSPRNG. There is no unsafe code in
//! this module.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::io::{Read, Write};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::wire::{NONCE_LEN, OPT_COMPRESSED, OPT_ENCRYPTED, TAG_LEN};

type HmacSha256 = Hmac<Sha256>;

/// Required key length for both HMAC and AEAD keys.
pub const KEY_LEN: usize = 32;

/// Truncated MAC length.
pub const HMAC_TRUNC_LEN: usize = 16;

/// DEFLATE level. Fixed so identical input compresses identically
/// across cooperating senders.
const DEFLATE_LEVEL: u32 = 6;

// ── HMAC ──────────────────────────────────────────────────────────────────────

/// First 16 bytes of HMAC-SHA-256 over `data`.
///
/// The key must be exactly 32 bytes.
pub fn hmac_tag(data: &[u8], key: &[u8]) -> Result<[u8; HMAC_TRUNC_LEN], CryptoError> {
    let key: &[u8; KEY_LEN] = key
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    Ok(hmac_tag_fixed(data, key))
}

/// Infallible variant for callers that already hold a 32-byte key.
pub fn hmac_tag_fixed(data: &[u8], key: &[u8; KEY_LEN]) -> [u8; HMAC_TRUNC_LEN] {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts 32-byte keys");
    mac.update(data);
    let full = mac.finalize().into_bytes();
    let mut tag = [0u8; HMAC_TRUNC_LEN];
    tag.copy_from_slice(&full[..HMAC_TRUNC_LEN]);
    tag
}

/// Constant-time comparison of a received tag against the expected one.
///
/// A length mismatch returns false immediately — tag lengths are public,
/// only the tag bytes themselves must not leak through timing.
pub fn hmac_verify(data: &[u8], key: &[u8], received: &[u8]) -> Result<bool, CryptoError> {
    let expected = hmac_tag(data, key)?;
    if received.len() != expected.len() {
        return Ok(false);
    }
    Ok(expected.ct_eq(received).into())
}

// ── AEAD ──────────────────────────────────────────────────────────────────────

/// Encrypt `plaintext` as `nonce(12) ‖ ciphertext ‖ tag(16)`.
///
/// The nonce is fresh random per call; sealing the same plaintext twice
/// produces distinct outputs.
pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength(key.len()));
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ct = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::AuthFailure)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ct.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ct);
    Ok(out)
}

/// Open a `nonce ‖ ciphertext ‖ tag` frame produced by [`seal`].
pub fn open(buf: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength(key.len()));
    }
    if buf.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::InvalidCiphertext);
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(&buf[..NONCE_LEN]);
    cipher
        .decrypt(nonce, &buf[NONCE_LEN..])
        .map_err(|_| CryptoError::AuthFailure)
}

// ── Compression ───────────────────────────────────────────────────────────────

/// Raw DEFLATE (no zlib header/trailer), level 6.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::DeflateEncoder::new(
        Vec::with_capacity(data.len() / 2 + 16),
        flate2::Compression::new(DEFLATE_LEVEL),
    );
    encoder
        .write_all(data)
        .expect("deflate into Vec cannot fail");
    encoder.finish().expect("deflate into Vec cannot fail")
}

/// Inflate a compressed body.
///
/// Accepts raw DEFLATE first; if that fails, retries as zlib-wrapped input
/// so streams from older peers still decode.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut out = Vec::new();
    match flate2::read::DeflateDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(_) => {
            let mut out = Vec::new();
            flate2::read::ZlibDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|_| CryptoError::DecompressFailure)?;
            Ok(out)
        }
    }
}

// ── Message body transforms ───────────────────────────────────────────────────

/// Outbound transform: compress, then encrypt, per `opts` bits.
///
/// Compression runs first because ciphertext is incompressible; chunking
/// happens above this layer so one nonce/tag covers the whole message.
pub fn transform_outbound(
    data: &[u8],
    opts: u8,
    enc_key: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    let mut body = if opts & OPT_COMPRESSED != 0 {
        compress(data)
    } else {
        data.to_vec()
    };
    if opts & OPT_ENCRYPTED != 0 {
        let key = enc_key.ok_or(CryptoError::MissingEncryptionKey)?;
        body = seal(&body, key)?;
    }
    Ok(body)
}

/// Inbound transform: decrypt, then decompress — the exact inverse order.
pub fn transform_inbound(
    data: &[u8],
    opts: u8,
    enc_key: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    let mut body = if opts & OPT_ENCRYPTED != 0 {
        let key = enc_key.ok_or(CryptoError::MissingEncryptionKey)?;
        open(data, key)?
    } else {
        data.to_vec()
    };
    if opts & OPT_COMPRESSED != 0 {
        body = decompress(&body)?;
    }
    Ok(body)
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("key must be exactly 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("ciphertext too short (need at least 28 bytes: 12 nonce + 16 tag)")]
    InvalidCiphertext,

    #[error("AEAD authentication failed")]
    AuthFailure,

    #[error("malformed compressed stream")]
    DecompressFailure,

    #[error("encryption requested but no encryption key available")]
    MissingEncryptionKey,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
