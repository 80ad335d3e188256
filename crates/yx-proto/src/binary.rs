//! Protocol 0x01 — chunked binary with optional compression and encryption.
//!
//! Send path: compress → encrypt → chunk. Compression runs on plaintext
//! (ciphertext is incompressible) and chunking runs last so one AEAD
//! nonce/tag covers the whole message regardless of how it splits.
//!
//! Receive path: chunks accumulate in per-message buffers keyed by
//! `(channel_id, sequence)`. On completion the inverse transforms run and
//! the message is delivered upward. Completed message keys are remembered
//! in a dedup ledger; partial buffers are reaped by age.
//!
//! All protocol state lives behind one mutex — channels never block each
//! other logically (disjoint keys) but share the instance lock, which is
//! the serialization the state machine requires.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use zerocopy::FromBytes;
use zeroize::Zeroizing;

use yx_core::crypto::{self, CryptoError, KEY_LEN};
use yx_core::wire::{self, ChunkHeader, CHUNK_HEADER_LEN, PROTO_BINARY};

use crate::router::{BoxError, Protocol};

/// Tunables for one protocol instance. Defaults mirror the normative
/// configuration surface.
#[derive(Debug, Clone)]
pub struct BinaryConfig {
    /// Max payload bytes per chunk.
    pub chunk_size: usize,
    /// Partial messages older than this are reaped without delivery.
    pub buffer_timeout: Duration,
    /// Completed message keys suppress repeats for this long.
    pub dedup_window: Duration,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            chunk_size: wire::DEFAULT_CHUNK_SIZE,
            buffer_timeout: Duration::from_secs(60),
            dedup_window: Duration::from_secs(5),
        }
    }
}

/// Upward delivery of one reassembled message: `(channel_id, data)`.
pub type BinaryCallback = Box<dyn Fn(u16, Vec<u8>) -> Result<(), BoxError> + Send + Sync>;

struct ReassemblyBuffer {
    chunks: HashMap<u32, Vec<u8>>,
    total_chunks: u32,
    opts: u8,
    created_at: Instant,
}

type MessageKey = (u16, u32);

struct BinaryState {
    /// Next sequence per channel, advanced after each full message built.
    sequences: HashMap<u16, u32>,
    buffers: HashMap<MessageKey, ReassemblyBuffer>,
    dedup: HashMap<MessageKey, Instant>,
}

pub struct BinaryProtocol {
    config: BinaryConfig,
    encryption_key: Option<Zeroizing<[u8; KEY_LEN]>>,
    on_message: BinaryCallback,
    state: Mutex<BinaryState>,
}

impl BinaryProtocol {
    pub fn new(
        config: BinaryConfig,
        encryption_key: Option<[u8; KEY_LEN]>,
        on_message: BinaryCallback,
    ) -> Result<Self, BinaryError> {
        if config.chunk_size == 0 {
            return Err(BinaryError::InvalidChunkSize);
        }
        Ok(Self {
            config,
            encryption_key: encryption_key.map(Zeroizing::new),
            on_message,
            state: Mutex::new(BinaryState {
                sequences: HashMap::new(),
                buffers: HashMap::new(),
                dedup: HashMap::new(),
            }),
        })
    }

    // ── Send path ─────────────────────────────────────────────────────────────

    /// Transform and chunk one message. Returns the `header ‖ chunk`
    /// payloads in index order, ready for the transport to MAC and emit.
    ///
    /// Advances this channel's sequence counter.
    pub fn encode_message(
        &self,
        data: &[u8],
        channel_id: u16,
        opts: u8,
    ) -> Result<Vec<Vec<u8>>, BinaryError> {
        let sequence = {
            let mut state = self.state.lock().expect("binary state poisoned");
            let counter = state.sequences.entry(channel_id).or_insert(0);
            let sequence = *counter;
            *counter = counter.wrapping_add(1);
            sequence
        };

        let body = crypto::transform_outbound(data, opts, self.enc_key_slice())?;
        Ok(wire::chunk_payloads(
            &body,
            opts,
            channel_id,
            sequence,
            self.config.chunk_size,
        ))
    }

    // ── Receive path ──────────────────────────────────────────────────────────

    fn handle_payload(&self, payload: &[u8]) -> Result<(), BoxError> {
        if payload.len() < CHUNK_HEADER_LEN {
            tracing::debug!(len = payload.len(), "binary payload shorter than header, dropping");
            return Ok(());
        }
        let Some(header) = ChunkHeader::read_from_prefix(payload) else {
            tracing::debug!("unparseable chunk header, dropping");
            return Ok(());
        };

        let total_chunks = header.total_chunks();
        let chunk_index = header.chunk_index();
        let key = header.message_key();
        let opts = header.opts;

        if total_chunks == 0 || chunk_index >= total_chunks {
            tracing::warn!(
                channel = key.0,
                sequence = key.1,
                chunk_index,
                total_chunks,
                "chunk header violates index bounds, dropping"
            );
            return Ok(());
        }

        let chunk = payload[CHUNK_HEADER_LEN..].to_vec();
        let now = Instant::now();

        // Everything that touches shared state happens under the lock;
        // decrypt/decompress and delivery happen after it is released.
        let completed: Option<(u16, u8, Vec<u8>)> = {
            let mut state = self.state.lock().expect("binary state poisoned");

            Self::reap_stale(&mut state, &self.config, now);

            if let Some(processed_at) = state.dedup.get(&key) {
                if now.duration_since(*processed_at) <= self.config.dedup_window {
                    tracing::debug!(channel = key.0, sequence = key.1, "duplicate message suppressed");
                    return Ok(());
                }
                state.dedup.remove(&key);
            }

            if total_chunks == 1 {
                state.dedup.insert(key, now);
                Some((key.0, opts, chunk))
            } else {
                let buffer = state.buffers.entry(key).or_insert_with(|| ReassemblyBuffer {
                    chunks: HashMap::new(),
                    total_chunks,
                    opts,
                    created_at: now,
                });

                if buffer.total_chunks != total_chunks || buffer.opts != opts {
                    tracing::warn!(
                        channel = key.0,
                        sequence = key.1,
                        "chunk disagrees with its message's header fields, dropping"
                    );
                    return Ok(());
                }

                // Authenticated duplicates overwrite; identical indices with
                // different bytes are suspicious enough to note.
                if buffer.chunks.insert(chunk_index, chunk).is_some() {
                    tracing::debug!(
                        channel = key.0,
                        sequence = key.1,
                        chunk_index,
                        "duplicate chunk index overwritten"
                    );
                }

                if buffer.chunks.len() == buffer.total_chunks as usize {
                    let buffer = state
                        .buffers
                        .remove(&key)
                        .expect("buffer present — just completed it");
                    state.dedup.insert(key, now);

                    let mut body = Vec::new();
                    for index in 0..buffer.total_chunks {
                        body.extend_from_slice(&buffer.chunks[&index]);
                    }
                    Some((key.0, buffer.opts, body))
                } else {
                    None
                }
            }
        };

        match completed {
            Some((channel_id, opts, body)) => self.deliver(channel_id, opts, &body),
            None => Ok(()),
        }
    }

    /// Inverse transforms then upward delivery. Crypto failures are local
    /// drops; callback errors propagate to the router's log.
    fn deliver(&self, channel_id: u16, opts: u8, body: &[u8]) -> Result<(), BoxError> {
        let data = match crypto::transform_inbound(body, opts, self.enc_key_slice()) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(channel = channel_id, error = %e, "reassembled message failed inverse transform, dropping");
                return Ok(());
            }
        };
        (self.on_message)(channel_id, data)
    }

    /// Age-based reclamation of partial buffers and stale dedup entries.
    /// Runs on every received chunk; partial messages never outlive
    /// `buffer_timeout` regardless of sender behavior.
    fn reap_stale(state: &mut BinaryState, config: &BinaryConfig, now: Instant) {
        state.buffers.retain(|key, buffer| {
            let stale = now.duration_since(buffer.created_at) > config.buffer_timeout;
            if stale {
                tracing::info!(
                    channel = key.0,
                    sequence = key.1,
                    received = buffer.chunks.len(),
                    expected = buffer.total_chunks,
                    "reassembly timed out, discarding partial message"
                );
            }
            !stale
        });
        let dedup_window = config.dedup_window;
        state
            .dedup
            .retain(|_, processed_at| now.duration_since(*processed_at) <= dedup_window);
    }

    fn enc_key_slice(&self) -> Option<&[u8]> {
        self.encryption_key.as_deref().map(|k| k.as_slice())
    }

    /// Number of in-progress reassemblies.
    pub fn pending_messages(&self) -> usize {
        self.state.lock().expect("binary state poisoned").buffers.len()
    }
}

impl Protocol for BinaryProtocol {
    fn id(&self) -> u8 {
        PROTO_BINARY
    }

    fn handle(&self, payload: &[u8]) -> Result<(), BoxError> {
        self.handle_payload(payload)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BinaryError {
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
