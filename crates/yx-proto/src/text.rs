//! Protocol 0x00 — single-datagram UTF-8 JSON.
//!
//! Framing is `0x00 ‖ JSON`. One datagram, one message; the JSON-RPC
//! method dispatcher above this layer decides what the value means.
//! Every decode failure is localized to the offending datagram.

use serde_json::Value;

use yx_core::wire::{PROTO_TEXT, TEXT_FRAGMENT_WARN};

use crate::router::{BoxError, Protocol};

/// Upward delivery of one parsed message. Errors are logged and dropped
/// by the router so a bad consumer cannot stall the receive loop.
pub type TextCallback = Box<dyn Fn(Value) -> Result<(), BoxError> + Send + Sync>;

pub struct TextProtocol {
    on_message: TextCallback,
}

impl TextProtocol {
    pub fn new(on_message: TextCallback) -> Self {
        Self { on_message }
    }

    /// Frame a message for sending: `0x00 ‖ UTF-8 JSON`.
    ///
    /// Protocol 0 is single-datagram; payloads past a conservative MTU
    /// risk IP fragmentation, which is worth a warning but not an error.
    pub fn encode(message: &Value) -> Result<Vec<u8>, serde_json::Error> {
        let json = serde_json::to_vec(message)?;
        let mut payload = Vec::with_capacity(1 + json.len());
        payload.push(PROTO_TEXT);
        payload.extend_from_slice(&json);

        if payload.len() > TEXT_FRAGMENT_WARN {
            tracing::warn!(
                bytes = payload.len(),
                limit = TEXT_FRAGMENT_WARN,
                "text payload exceeds single-datagram comfort zone, may fragment"
            );
        }
        Ok(payload)
    }
}

impl Protocol for TextProtocol {
    fn id(&self) -> u8 {
        PROTO_TEXT
    }

    fn handle(&self, payload: &[u8]) -> Result<(), BoxError> {
        match payload.first() {
            Some(&PROTO_TEXT) => {}
            _ => {
                tracing::warn!("text handler received non-text payload, dropping");
                return Ok(());
            }
        }

        let text = match std::str::from_utf8(&payload[1..]) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "text payload is not UTF-8, dropping");
                return Ok(());
            }
        };

        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "text payload is not JSON, dropping");
                return Ok(());
            }
        };

        (self.on_message)(value)
    }
}
