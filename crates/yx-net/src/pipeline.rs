//! The per-datagram receive pipeline.
//!
//! Canonical check order, each a cheap rejection gate for the next:
//!
//! ```text
//! parse ‖ MAC verify → replay → rate limit → self-GUID filter → route
//! ```
//!
//! MAC comes first because every later check trusts the GUID. Replay runs
//! before rate limiting so a replayed packet can never refresh a peer's
//! window. The self filter runs after rate limiting so a misbehaving local
//! sender still gets counted and cannot starve itself invisible.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use yx_core::config::YxConfig;
use yx_core::guid::{self, Guid};
use yx_core::packet::{self, VerifyError};
use yx_proto::{KeyStore, ProtocolRouter, RateLimiter, ReplayCache};

use crate::faillog::FailureLog;

/// What the pipeline did with one datagram. Returned for observability;
/// every non-`Routed` case is a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Authenticated, admitted, and handed to a protocol handler.
    Routed,
    /// Authenticated and admitted, but no handler claimed the payload.
    Unroutable,
    /// Below the 22-byte minimum.
    TooShort,
    /// MAC mismatch. A forensic record was appended.
    AuthFailure,
    /// Nonce seen within the replay window.
    Replayed,
    /// Peer exceeded its sliding window.
    RateLimited,
    /// Bears the local GUID while own-packet processing is disabled.
    OwnPacket,
}

pub struct ReceivePipeline {
    keystore: Arc<KeyStore>,
    replay: Mutex<ReplayCache>,
    ratelimit: Mutex<RateLimiter>,
    router: ProtocolRouter,
    faillog: FailureLog,
    local_guid: Guid,
    process_own_packets: bool,
}

impl ReceivePipeline {
    /// Assemble the pipeline from validated config plus the shared key
    /// store and a fully registered router.
    pub fn new(
        config: &YxConfig,
        keystore: Arc<KeyStore>,
        router: ProtocolRouter,
        local_guid: Guid,
    ) -> Result<Self, std::io::Error> {
        let mut ratelimit = RateLimiter::new(config.max_requests, config.window());
        for trusted in &config.trusted_guids {
            ratelimit.add_trusted(trusted);
        }

        Ok(Self {
            keystore,
            replay: Mutex::new(ReplayCache::new(
                config.replay_max_age(),
                config.replay_cleanup_interval,
            )),
            ratelimit: Mutex::new(ratelimit),
            router,
            faillog: FailureLog::open(&config.failure_log_path)?,
            local_guid,
            process_own_packets: config.process_own_packets,
        })
    }

    /// Run one received datagram through every gate.
    pub fn process(&self, bytes: &[u8], src: SocketAddr) -> Disposition {
        let packet = match packet::verify(bytes, |guid_hex| self.keystore.hmac_key(guid_hex)) {
            Ok(p) => p,
            Err(VerifyError::Wire(e)) => {
                tracing::debug!(%src, error = %e, "unframeable datagram dropped");
                return Disposition::TooShort;
            }
            Err(VerifyError::AuthFailure(report)) => {
                tracing::warn!(
                    %src,
                    guid = guid::to_hex(&report.guid),
                    "MAC verification failed, dropping"
                );
                self.faillog.record(&src, &report, bytes);
                return Disposition::AuthFailure;
            }
        };

        let guid_hex = guid::to_hex(&packet.guid);

        {
            let mut replay = self.replay.lock().expect("replay cache mutex poisoned");
            if !replay.check_and_record(packet.mac) {
                tracing::warn!(
                    %src,
                    nonce = hex::encode(packet.mac),
                    "replayed packet dropped"
                );
                return Disposition::Replayed;
            }
        }

        {
            let mut ratelimit = self.ratelimit.lock().expect("rate limiter mutex poisoned");
            if !ratelimit.allow(Some(&guid_hex), &src.to_string()) {
                return Disposition::RateLimited;
            }
        }

        if !self.process_own_packets && packet.guid == self.local_guid {
            tracing::trace!("own packet dropped");
            return Disposition::OwnPacket;
        }

        if self.router.route(&packet.payload) {
            Disposition::Routed
        } else {
            Disposition::Unroutable
        }
    }
}
