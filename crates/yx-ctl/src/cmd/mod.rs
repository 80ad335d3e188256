//! Subcommand implementations and the fixed test identity.

pub mod recv;
pub mod send;
pub mod vectors;

/// Harness sender GUID.
pub const TEST_GUID: [u8; 6] = [0x01; 6];

/// Harness HMAC key.
pub const TEST_HMAC_KEY: [u8; 32] = [0x00; 32];

/// Harness AEAD key.
pub const TEST_AEAD_KEY: [u8; 32] = [0x42; 32];

/// Default harness port.
pub const TEST_PORT: u16 = 49_999;

/// The harness port, honoring the TEST_YX_PORT override.
pub fn test_port() -> u16 {
    std::env::var("TEST_YX_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(TEST_PORT)
}
