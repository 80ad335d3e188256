//! YX wire format — on-wire types for every YX datagram.
//!
//! These types ARE the protocol. Every field, every size, every reserved
//! protocol ID is part of the wire format and must stay bit-identical
//! across implementations. Changing anything here is a breaking change.
//!
//! The chunk header is #[repr(C, packed)] for deterministic layout and uses
//! zerocopy derives for safe, allocation-free serialization. There is no
//! unsafe code in this module.

use bytes::Bytes;
use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Truncated HMAC-SHA-256 length prefixing every datagram.
pub const MAC_LEN: usize = 16;

/// Sender identifier length.
pub const GUID_LEN: usize = 6;

/// Smallest parseable datagram: MAC + GUID with an empty payload.
pub const PACKET_MIN: usize = MAC_LEN + GUID_LEN;

/// Binary chunk header length.
pub const CHUNK_HEADER_LEN: usize = 16;

/// AES-256-GCM nonce length (prefix of an encrypted message body).
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM authentication tag length (suffix of an encrypted body).
pub const TAG_LEN: usize = 16;

/// Protocol 0: single-datagram UTF-8 JSON.
pub const PROTO_TEXT: u8 = 0x00;

/// Protocol 1: chunked binary with optional compression and encryption.
pub const PROTO_BINARY: u8 = 0x01;

/// Reserved for future extension: Task-Hello.
pub const PROTO_TASK_HELLO: u8 = 0x21;

/// Reserved for future extension: RPC-Chain.
pub const PROTO_RPC_CHAIN: u8 = 0x22;

/// Reserved for future extension: Task-Chain.
pub const PROTO_TASK_CHAIN: u8 = 0x23;

/// protoOpts bit 0: message body is DEFLATE-compressed.
pub const OPT_COMPRESSED: u8 = 0x01;

/// protoOpts bit 1: message body is AES-256-GCM encrypted.
pub const OPT_ENCRYPTED: u8 = 0x02;

/// Default maximum chunk payload bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Payload size past which Protocol 0 warns about IP fragmentation:
/// a conservative MTU minus the 22-byte YX envelope.
pub const TEXT_FRAGMENT_WARN: usize = 1450;

// ── Packet container ──────────────────────────────────────────────────────────

/// The wire unit: `MAC(16) ‖ GUID(6) ‖ Payload(N)`.
///
/// The MAC is computed over `guid ‖ payload`. The payload is opaque to the
/// transport; when non-empty its first byte is a protocol ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub mac: [u8; MAC_LEN],
    pub guid: [u8; GUID_LEN],
    pub payload: Bytes,
}

impl Packet {
    /// Serialize for transmission. One allocation, exact size.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PACKET_MIN + self.payload.len());
        out.extend_from_slice(&self.mac);
        out.extend_from_slice(&self.guid);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse a received datagram into its three slices.
    ///
    /// Performs the minimum-size check only — MAC verification is the
    /// packet verifier's job.
    pub fn parse(bytes: &[u8]) -> Result<Packet, WireError> {
        if bytes.len() < PACKET_MIN {
            return Err(WireError::TooShort {
                need: PACKET_MIN,
                got: bytes.len(),
            });
        }
        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&bytes[..MAC_LEN]);
        let mut guid = [0u8; GUID_LEN];
        guid.copy_from_slice(&bytes[MAC_LEN..PACKET_MIN]);
        Ok(Packet {
            mac,
            guid,
            payload: Bytes::copy_from_slice(&bytes[PACKET_MIN..]),
        })
    }
}

// ── Binary chunk header ───────────────────────────────────────────────────────

/// Header prefixing every Protocol 1 chunk. 16 bytes, big-endian.
///
/// A message is identified by `(channel_id, sequence)`; all chunks of one
/// message share `opts` and `total_chunks`, and `chunk_index < total_chunks`.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct ChunkHeader {
    /// Always PROTO_BINARY.
    pub proto: u8,
    /// Bit flags: OPT_COMPRESSED, OPT_ENCRYPTED.
    pub opts: u8,
    /// Logical stream within Protocol 1. Streams are independent.
    pub channel_id: U16<BigEndian>,
    /// Per-channel message counter, monotonic modulo 2^32.
    pub sequence: U32<BigEndian>,
    /// 0-based position of this chunk within the message.
    pub chunk_index: U32<BigEndian>,
    /// Total chunks in the message. Always ≥ 1.
    pub total_chunks: U32<BigEndian>,
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(ChunkHeader, [u8; CHUNK_HEADER_LEN]);

impl ChunkHeader {
    pub fn new(opts: u8, channel_id: u16, sequence: u32, chunk_index: u32, total_chunks: u32) -> Self {
        Self {
            proto: PROTO_BINARY,
            opts,
            channel_id: U16::new(channel_id),
            sequence: U32::new(sequence),
            chunk_index: U32::new(chunk_index),
            total_chunks: U32::new(total_chunks),
        }
    }

    // Accessors copy packed fields to locals to avoid unaligned reference UB.

    pub fn channel_id(&self) -> u16 {
        let v = self.channel_id;
        v.get()
    }

    pub fn sequence(&self) -> u32 {
        let v = self.sequence;
        v.get()
    }

    pub fn chunk_index(&self) -> u32 {
        let v = self.chunk_index;
        v.get()
    }

    pub fn total_chunks(&self) -> u32 {
        let v = self.total_chunks;
        v.get()
    }

    /// `(channel_id, sequence)` — identifies one reassembly buffer and one
    /// dedup entry.
    pub fn message_key(&self) -> (u16, u32) {
        (self.channel_id(), self.sequence())
    }
}

/// Split an already-transformed message body into `header ‖ chunk` payloads.
///
/// `transformed` is the body after compression/encryption. Emits at least
/// one chunk even for an empty body so a receiver always sees the message.
/// `chunk_size` must be ≥ 1 — callers validate before reaching here.
pub fn chunk_payloads(
    transformed: &[u8],
    opts: u8,
    channel_id: u16,
    sequence: u32,
    chunk_size: usize,
) -> Vec<Vec<u8>> {
    debug_assert!(chunk_size >= 1);
    let total = transformed.len().div_ceil(chunk_size).max(1) as u32;
    let mut out = Vec::with_capacity(total as usize);
    for index in 0..total {
        let start = index as usize * chunk_size;
        let end = (start + chunk_size).min(transformed.len());
        let header = ChunkHeader::new(opts, channel_id, sequence, index, total);
        let mut payload = Vec::with_capacity(CHUNK_HEADER_LEN + (end - start));
        payload.extend_from_slice(header.as_bytes());
        payload.extend_from_slice(&transformed[start..end]);
        out.push(payload);
    }
    out
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("datagram too short: need {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("malformed chunk header")]
    BadHeader,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
