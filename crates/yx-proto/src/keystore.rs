//! Symmetric key storage.
//!
//! One mandatory default HMAC key plus an optional per-peer map keyed by
//! GUID hex. Lookups fall back to the default on miss, which is what makes
//! a fleet bootstrappable with a single shared key. No persistence — keys
//! live exactly as long as the process.
//!
//! Key bytes are wrapped in Zeroizing so they are wiped on drop and on
//! entry replacement.

use std::time::SystemTime;

use dashmap::DashMap;
use zeroize::Zeroizing;

use yx_core::crypto::{CryptoError, KEY_LEN};

/// Per-peer key material.
struct PeerKeys {
    hmac_key: Zeroizing<[u8; KEY_LEN]>,
    encryption_key: Option<Zeroizing<[u8; KEY_LEN]>>,
    installed_at: SystemTime,
}

/// Default + per-peer 32-byte keys. Shareable across tasks as-is; the
/// inner map is concurrent.
pub struct KeyStore {
    default_hmac: Zeroizing<[u8; KEY_LEN]>,
    default_encryption: Option<Zeroizing<[u8; KEY_LEN]>>,
    peers: DashMap<String, PeerKeys>,
}

impl KeyStore {
    /// Create a store with the fleet's default HMAC key.
    pub fn new(default_hmac_key: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            default_hmac: Zeroizing::new(checked(default_hmac_key)?),
            default_encryption: None,
            peers: DashMap::new(),
        })
    }

    /// Install a default encryption key used when a peer entry has none.
    pub fn with_encryption_key(mut self, key: &[u8]) -> Result<Self, CryptoError> {
        self.default_encryption = Some(Zeroizing::new(checked(key)?));
        Ok(self)
    }

    /// Install or replace a peer entry. Replacement zeroizes the old keys.
    pub fn set_peer(
        &self,
        guid_hex: &str,
        hmac_key: &[u8],
        encryption_key: Option<&[u8]>,
    ) -> Result<(), CryptoError> {
        let entry = PeerKeys {
            hmac_key: Zeroizing::new(checked(hmac_key)?),
            encryption_key: match encryption_key {
                Some(k) => Some(Zeroizing::new(checked(k)?)),
                None => None,
            },
            installed_at: SystemTime::now(),
        };
        self.peers.insert(normalize(guid_hex), entry);
        Ok(())
    }

    /// Remove a peer entry. Returns whether one existed.
    pub fn remove_peer(&self, guid_hex: &str) -> bool {
        self.peers.remove(&normalize(guid_hex)).is_some()
    }

    /// HMAC key for a peer, or the default on miss.
    pub fn hmac_key(&self, guid_hex: &str) -> [u8; KEY_LEN] {
        self.peers
            .get(&normalize(guid_hex))
            .map(|e| *e.hmac_key)
            .unwrap_or(*self.default_hmac)
    }

    /// Encryption key for a peer, falling back to the default encryption
    /// key. None means encrypted traffic with this peer cannot be handled.
    pub fn encryption_key(&self, guid_hex: &str) -> Option<[u8; KEY_LEN]> {
        self.peers
            .get(&normalize(guid_hex))
            .and_then(|e| e.encryption_key.as_ref().map(|k| **k))
            .or_else(|| self.default_encryption.as_ref().map(|k| **k))
    }

    /// When the peer's current entry was installed.
    pub fn installed_at(&self, guid_hex: &str) -> Option<SystemTime> {
        self.peers.get(&normalize(guid_hex)).map(|e| e.installed_at)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

fn checked(key: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    key.try_into()
        .map_err(|_| CryptoError::InvalidKeyLength(key.len()))
}

fn normalize(guid_hex: &str) -> String {
    guid_hex.to_ascii_lowercase()
}
