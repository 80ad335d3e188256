//! Replay suppression.
//!
//! The nonce is the 16-byte packet MAC: already computed, unique among
//! authentic packets from honest senders, and forgeable only by forging the
//! MAC itself. Entries age out after `max_age`; collection is amortized
//! over inserts so the hot path stays O(1). Memory is bounded by
//! rate · max_age.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use yx_core::wire::MAC_LEN;

/// Nonce → first-seen map with time-windowed expiry.
pub struct ReplayCache {
    max_age: Duration,
    cleanup_interval: u32,
    inserts_since_gc: u32,
    seen: HashMap<[u8; MAC_LEN], Instant>,
}

impl ReplayCache {
    /// `cleanup_interval` is the number of successful inserts between GC
    /// sweeps (normative default 100).
    pub fn new(max_age: Duration, cleanup_interval: u32) -> Self {
        Self {
            max_age,
            cleanup_interval: cleanup_interval.max(1),
            inserts_since_gc: 0,
            seen: HashMap::new(),
        }
    }

    /// Returns false iff `nonce` was recorded within `max_age`; otherwise
    /// records it as seen now and returns true.
    pub fn check_and_record(&mut self, nonce: [u8; MAC_LEN]) -> bool {
        let now = Instant::now();

        if let Some(first_seen) = self.seen.get(&nonce) {
            if now.duration_since(*first_seen) <= self.max_age {
                return false;
            }
            // Expired entry — the nonce is admissible again.
        }

        self.seen.insert(nonce, now);
        self.inserts_since_gc += 1;
        if self.inserts_since_gc >= self.cleanup_interval {
            self.inserts_since_gc = 0;
            self.sweep(now);
        }
        true
    }

    fn sweep(&mut self, now: Instant) {
        let max_age = self.max_age;
        let before = self.seen.len();
        self.seen
            .retain(|_, first_seen| now.duration_since(*first_seen) <= max_age);
        let removed = before - self.seen.len();
        if removed > 0 {
            tracing::debug!(removed, retained = self.seen.len(), "replay cache swept");
        }
    }

    /// Current number of tracked nonces (includes not-yet-swept expired ones).
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
