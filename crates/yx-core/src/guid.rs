//! 6-byte sender identifier.
//!
//! Not a UUID — uniqueness only matters within one cooperating fleet.
//! Stored and compared as raw bytes; rendered as lowercase hex for key
//! lookups and logs.

use rand::RngCore;

use crate::wire::GUID_LEN;

/// Raw sender identifier.
pub type Guid = [u8; GUID_LEN];

/// Generate a random GUID from the thread-local CSPRNG.
pub fn generate() -> Guid {
    let mut guid = [0u8; GUID_LEN];
    rand::thread_rng().fill_bytes(&mut guid);
    guid
}

/// Force arbitrary bytes into GUID shape: right-pad with zeros if short,
/// truncate if long.
pub fn normalize(bytes: &[u8]) -> Guid {
    let mut guid = [0u8; GUID_LEN];
    let n = bytes.len().min(GUID_LEN);
    guid[..n].copy_from_slice(&bytes[..n]);
    guid
}

/// Lowercase hex rendering — the canonical key-store and log form.
pub fn to_hex(guid: &Guid) -> String {
    hex::encode(guid)
}

/// Parse hex back into a GUID, normalizing length.
pub fn from_hex(s: &str) -> Result<Guid, GuidError> {
    let bytes = hex::decode(s)?;
    Ok(normalize(&bytes))
}

#[derive(Debug, thiserror::Error)]
pub enum GuidError {
    #[error("invalid GUID hex: {0}")]
    BadHex(#[from] hex::FromHexError),
}
