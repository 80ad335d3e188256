//! Packet builder and verifier.
//!
//! `build` computes the MAC over `guid ‖ payload` and returns the container;
//! `verify` recomputes it from received bytes and compares in constant time.
//! Key resolution goes through a caller-supplied lookup so the verifier has
//! no opinion about where keys live — the key store's default-fallback rule
//! is applied by the lookup itself.

use bytes::Bytes;

use crate::crypto::{self, CryptoError, KEY_LEN};
use crate::guid::{self, Guid};
#[cfg(not(test))]
use crate::wire::{Packet, WireError, GUID_LEN, MAC_LEN};
#[cfg(test)]
use crate::wire::{Packet, WireError, GUID_LEN, MAC_LEN, PACKET_MIN};

/// Build an authenticated packet. The GUID is normalized to 6 bytes first.
pub fn build(guid_bytes: &[u8], payload: impl Into<Bytes>, key: &[u8]) -> Result<Packet, CryptoError> {
    let guid = guid::normalize(guid_bytes);
    let payload = payload.into();

    let mut signed = Vec::with_capacity(GUID_LEN + payload.len());
    signed.extend_from_slice(&guid);
    signed.extend_from_slice(&payload);
    let mac = crypto::hmac_tag(&signed, key)?;

    Ok(Packet { mac, guid, payload })
}

/// Verify received bytes and return the parsed packet.
///
/// `key_lookup` maps the sender's GUID hex to the 32-byte HMAC key to check
/// against (falling back to the default key is the lookup's job). On MAC
/// mismatch the returned [`AuthFailure`] carries everything the forensic
/// log needs.
pub fn verify<F>(bytes: &[u8], key_lookup: F) -> Result<Packet, VerifyError>
where
    F: FnOnce(&str) -> [u8; KEY_LEN],
{
    let packet = Packet::parse(bytes)?;

    let key = key_lookup(&guid::to_hex(&packet.guid));

    let mut signed = Vec::with_capacity(GUID_LEN + packet.payload.len());
    signed.extend_from_slice(&packet.guid);
    signed.extend_from_slice(&packet.payload);
    let expected = crypto::hmac_tag_fixed(&signed, &key);

    if !bool::from(subtle::ConstantTimeEq::ct_eq(&expected[..], &packet.mac[..])) {
        return Err(VerifyError::AuthFailure(Box::new(AuthFailure {
            guid: packet.guid,
            expected_mac: expected,
            received_mac: packet.mac,
        })));
    }

    Ok(packet)
}

/// Details of a failed MAC verification, destined for the forensic log.
/// Contains no key or plaintext material.
#[derive(Debug, Clone)]
pub struct AuthFailure {
    pub guid: Guid,
    pub expected_mac: [u8; MAC_LEN],
    pub received_mac: [u8; MAC_LEN],
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("packet MAC mismatch for guid {}", guid::to_hex(&.0.guid))]
    AuthFailure(Box<AuthFailure>),
}

impl VerifyError {
    /// True for the short-datagram case, which drops silently rather than
    /// logging forensics.
    pub fn is_framing(&self) -> bool {
        matches!(self, VerifyError::Wire(_))
    }
}
