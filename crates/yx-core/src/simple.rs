//! Stateless packet construction.
//!
//! Pure, synchronous functions for callers that want wire bytes without
//! owning sockets or protocol state — test harnesses, one-shot senders,
//! other-language shims. For identical inputs on RNG-free paths (no
//! encryption) the output is byte-identical to the stateful send path,
//! because both go through the same transform and chunking code.

use serde_json::Value;

use crate::crypto::{self, CryptoError, KEY_LEN};
use crate::guid::Guid;
use crate::packet;
use crate::wire::{self, Packet, PACKET_MIN, PROTO_TEXT};

/// Frame `message` as Protocol 0 and build one authenticated packet.
pub fn build_text_packet(message: &Value, guid: &[u8], key: &[u8]) -> Result<Vec<u8>, SimpleError> {
    let json = serde_json::to_vec(message)?;
    let mut payload = Vec::with_capacity(1 + json.len());
    payload.push(PROTO_TEXT);
    payload.extend_from_slice(&json);
    Ok(packet::build(guid, payload, key)?.to_bytes())
}

/// Transform `data` (compress → encrypt per `opts`), chunk it, and build
/// one authenticated packet per chunk.
///
/// `sequence` is caller-supplied — this function holds no channel state.
#[allow(clippy::too_many_arguments)]
pub fn build_binary_packets(
    data: &[u8],
    guid: &[u8],
    hmac_key: &[u8],
    opts: u8,
    enc_key: Option<&[u8]>,
    channel_id: u16,
    sequence: u32,
    chunk_size: usize,
) -> Result<Vec<Vec<u8>>, SimpleError> {
    if chunk_size == 0 {
        return Err(SimpleError::InvalidChunkSize);
    }

    let body = crypto::transform_outbound(data, opts, enc_key)?;
    wire::chunk_payloads(&body, opts, channel_id, sequence, chunk_size)
        .into_iter()
        .map(|payload| Ok(packet::build(guid, payload, hmac_key)?.to_bytes()))
        .collect()
}

/// True iff `bytes` parse as a packet whose MAC verifies under `key`.
pub fn verify_packet(bytes: &[u8], key: &[u8]) -> bool {
    let key: [u8; KEY_LEN] = match key.try_into() {
        Ok(k) => k,
        Err(_) => return false,
    };
    packet::verify(bytes, |_| key).is_ok()
}

/// The sender GUID of a well-framed packet, without verifying it.
pub fn extract_guid(bytes: &[u8]) -> Option<Guid> {
    Packet::parse(bytes).ok().map(|p| p.guid)
}

/// The payload slice of a well-framed packet, without verifying it.
pub fn extract_payload(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() < PACKET_MIN {
        return None;
    }
    Some(&bytes[PACKET_MIN..])
}

#[derive(Debug, thiserror::Error)]
pub enum SimpleError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("message is not serializable JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chunk size must be at least 1")]
    InvalidChunkSize,
}
