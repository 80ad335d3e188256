//! Per-peer sliding-window rate limiting.
//!
//! Each peer gets a ring of request timestamps; a call is admitted iff
//! fewer than `max_requests` remain inside the window after pruning.
//! Trusted GUIDs bypass counting entirely. Memory is
//! O(peers × max_requests).

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Normative minimum for `max_requests`. Configuring less silently drops
/// legitimate traffic from peers tuned to the default, so construction
/// warns loudly below this floor.
pub const MAX_REQUESTS_FLOOR: usize = 10_000;

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    peers: HashMap<String, VecDeque<Instant>>,
    trusted: HashSet<String>,
    /// Peers currently over the limit — used to emit one warning per
    /// breach streak instead of one per packet.
    breached: HashSet<String>,
}

impl RateLimiter {
    /// Normative defaults: `max_requests = 10000`, `window = 60 s`.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        if max_requests < MAX_REQUESTS_FLOOR {
            tracing::warn!(
                max_requests,
                floor = MAX_REQUESTS_FLOOR,
                "rate limit below the normative minimum — interoperating peers may be dropped"
            );
        }
        Self {
            max_requests,
            window,
            peers: HashMap::new(),
            trusted: HashSet::new(),
            breached: HashSet::new(),
        }
    }

    /// Whitelist a GUID to bypass all counting.
    pub fn add_trusted(&mut self, guid_hex: &str) {
        self.trusted.insert(normalize(guid_hex));
    }

    pub fn is_trusted(&self, guid_hex: &str) -> bool {
        self.trusted.contains(&normalize(guid_hex))
    }

    /// Admit or reject one request.
    ///
    /// `peer_guid_hex` is the authenticated sender GUID; callers counting
    /// before authentication pass None and the source address keys the
    /// window instead.
    pub fn allow(&mut self, peer_guid_hex: Option<&str>, source_addr: &str) -> bool {
        let peer_key = match peer_guid_hex {
            Some(guid_hex) => {
                let normalized = normalize(guid_hex);
                if self.trusted.contains(&normalized) {
                    return true;
                }
                normalized
            }
            None => source_addr.to_string(),
        };

        let now = Instant::now();
        let window = self.window;
        let ring = self.peers.entry(peer_key.clone()).or_default();

        while let Some(oldest) = ring.front() {
            if now.duration_since(*oldest) > window {
                ring.pop_front();
            } else {
                break;
            }
        }

        if ring.len() >= self.max_requests {
            if self.breached.insert(peer_key.clone()) {
                tracing::warn!(
                    peer = %peer_key,
                    source = %source_addr,
                    max_requests = self.max_requests,
                    "rate limit exceeded — dropping until the window slides"
                );
            }
            return false;
        }

        ring.push_back(now);
        self.breached.remove(&peer_key);
        true
    }

    /// Drop rings that have gone fully idle. Call opportunistically.
    pub fn prune_idle(&mut self) {
        let now = Instant::now();
        let window = self.window;
        self.peers.retain(|_, ring| {
            ring.back()
                .is_some_and(|last| now.duration_since(*last) <= window)
        });
    }

    pub fn tracked_peers(&self) -> usize {
        self.peers.len()
    }
}

fn normalize(guid_hex: &str) -> String {
    guid_hex.to_ascii_uppercase()
}
