//! Conformance vector generation and checking.
//!
//! The vector file is the cross-implementation oracle for the MAC path:
//! deterministic inputs, expected truncated HMAC, expected full packet.
//! AEAD is deliberately absent — its nonce makes output nondeterministic.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use yx_core::packet;

#[derive(Debug, Serialize, Deserialize)]
pub struct Vector {
    pub name: String,
    /// Sender GUID, hex. May be shorter than 6 bytes to exercise padding.
    pub guid: String,
    /// 32-byte HMAC key, hex.
    pub key: String,
    pub payload_hex: String,
    pub expected_hmac: String,
    pub expected_packet: String,
}

/// The canonical vector inputs. The first entry is scenario S2's tuple.
fn canonical_inputs() -> Vec<(&'static str, Vec<u8>, Vec<u8>, Vec<u8>)> {
    let zero_key = vec![0u8; 32];
    vec![
        (
            "canonical-text-bytes",
            vec![0x01; 6],
            zero_key.clone(),
            b"test".to_vec(),
        ),
        ("empty-payload", vec![0x01; 6], zero_key.clone(), Vec::new()),
        (
            "short-guid-padded",
            vec![0xAA, 0xBB],
            zero_key.clone(),
            b"pad".to_vec(),
        ),
        ("nonzero-key", vec![0x01; 6], vec![0x42; 32], b"test".to_vec()),
        (
            "text-protocol-frame",
            vec![0x01; 6],
            zero_key.clone(),
            {
                let mut p = vec![0x00];
                p.extend_from_slice(br#"{"method":"test","params":{"value":42}}"#);
                p
            },
        ),
        (
            "binary-header-single-chunk",
            vec![0x01; 6],
            zero_key,
            {
                let header = yx_core::wire::ChunkHeader::new(0, 7, 1, 0, 1);
                let mut p = zerocopy_bytes(&header);
                p.extend_from_slice(&[0xAB; 8]);
                p
            },
        ),
    ]
}

fn zerocopy_bytes(header: &yx_core::wire::ChunkHeader) -> Vec<u8> {
    use zerocopy::AsBytes;
    header.as_bytes().to_vec()
}

fn compute(name: &str, guid: &[u8], key: &[u8], payload: &[u8]) -> Result<Vector> {
    let packet = packet::build(guid, payload.to_vec(), key)
        .with_context(|| format!("vector '{name}' failed to build"))?;
    Ok(Vector {
        name: name.to_string(),
        guid: hex::encode(guid),
        key: hex::encode(key),
        payload_hex: hex::encode(payload),
        expected_hmac: hex::encode(packet.mac),
        expected_packet: hex::encode(packet.to_bytes()),
    })
}

/// Write the vector file this build produces.
pub fn cmd_generate(path: &str) -> Result<()> {
    let vectors = canonical_inputs()
        .iter()
        .map(|(name, guid, key, payload)| compute(name, guid, key, payload))
        .collect::<Result<Vec<_>>>()?;

    let text = serde_json::to_string_pretty(&vectors)?;
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text).with_context(|| format!("failed to write {path}"))?;

    println!("wrote {} vectors to {path}", vectors.len());
    Ok(())
}

/// Validate this build bit-for-bit against a vector file.
pub fn cmd_check(path: &str) -> Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let vectors: Vec<Vector> = serde_json::from_str(&text).context("malformed vector file")?;

    let mut failures = 0usize;
    for v in &vectors {
        let guid = hex::decode(&v.guid).context("vector guid is not hex")?;
        let key = hex::decode(&v.key).context("vector key is not hex")?;
        let payload = hex::decode(&v.payload_hex).context("vector payload is not hex")?;

        let got = compute(&v.name, &guid, &key, &payload)?;
        if got.expected_hmac != v.expected_hmac || got.expected_packet != v.expected_packet {
            failures += 1;
            eprintln!(
                "MISMATCH {}: hmac {} != {}",
                v.name, got.expected_hmac, v.expected_hmac
            );
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} vectors mismatched", vectors.len());
    }
    println!("all {} vectors match", vectors.len());
    Ok(())
}
