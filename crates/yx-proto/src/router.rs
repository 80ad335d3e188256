//! First-byte protocol dispatch.
//!
//! Payloads reaching the router are already authenticated; the first byte
//! selects a registered handler. Handlers receive the full payload
//! (including the ID byte) as a borrowed view.

use std::collections::HashMap;
use std::sync::Arc;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A registered wire protocol.
pub trait Protocol: Send + Sync {
    /// The protocol ID byte this handler owns.
    fn id(&self) -> u8;

    /// Handle one authenticated payload. Errors are logged by the router,
    /// never propagated — one bad payload must not stall the receive loop.
    fn handle(&self, payload: &[u8]) -> Result<(), BoxError>;
}

/// Maps protocol ID bytes to handlers and dispatches payloads.
pub struct ProtocolRouter {
    handlers: HashMap<u8, Arc<dyn Protocol>>,
}

impl ProtocolRouter {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its own ID. Re-registering replaces.
    pub fn register(&mut self, protocol: Arc<dyn Protocol>) {
        self.handlers.insert(protocol.id(), protocol);
    }

    /// Dispatch one payload. Returns true iff a handler ran.
    pub fn route(&self, payload: &[u8]) -> bool {
        let Some(&id) = payload.first() else {
            // Empty payloads carry nothing to dispatch on.
            tracing::trace!("empty payload dropped");
            return false;
        };

        let Some(handler) = self.handlers.get(&id) else {
            tracing::debug!(proto = format_args!("{id:#04x}"), "no handler registered, dropping");
            return false;
        };

        if let Err(e) = handler.handle(payload) {
            tracing::warn!(proto = format_args!("{id:#04x}"), error = %e, "protocol handler failed");
        }
        true
    }
}

impl Default for ProtocolRouter {
    fn default() -> Self {
        Self::new()
    }
}
