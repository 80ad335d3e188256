//! Conformance vectors — the bit-for-bit MAC oracle shared across
//! implementations. The checked-in JSON file is authoritative; this build
//! must reproduce every packet exactly.

use crate::*;
use serde_json::Value;

fn vectors() -> Vec<Value> {
    let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("vectors/yx_vectors.json");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("vector file {} unreadable: {e}", path.display()));
    serde_json::from_str::<Vec<Value>>(&text).expect("vector file is malformed JSON")
}

#[test]
fn every_vector_reproduces_bit_for_bit() {
    let vectors = vectors();
    assert!(!vectors.is_empty());

    for v in &vectors {
        let name = v["name"].as_str().unwrap();
        let guid = hex::decode(v["guid"].as_str().unwrap()).unwrap();
        let key = hex::decode(v["key"].as_str().unwrap()).unwrap();
        let payload = hex::decode(v["payload_hex"].as_str().unwrap()).unwrap();

        let packet = yx_core::packet::build(&guid, payload, &key)
            .unwrap_or_else(|e| panic!("vector '{name}' failed to build: {e}"));

        assert_eq!(
            hex::encode(packet.mac),
            v["expected_hmac"].as_str().unwrap(),
            "vector '{name}' MAC mismatch"
        );
        assert_eq!(
            hex::encode(packet.to_bytes()),
            v["expected_packet"].as_str().unwrap(),
            "vector '{name}' packet mismatch"
        );
    }
}

#[test]
fn canonical_tuple_is_present() {
    // S2: guid = 0x01*6, key = 0x00*32, payload = "test".
    let vectors = vectors();
    let canonical = vectors
        .iter()
        .find(|v| {
            v["guid"].as_str() == Some("010101010101")
                && v["payload_hex"].as_str() == Some(hex::encode(b"test").as_str())
                && v["key"].as_str().is_some_and(|k| k == "00".repeat(32))
        })
        .expect("canonical vector missing from the oracle file");

    let packet = yx_core::packet::build(&TEST_GUID, b"test".to_vec(), &TEST_HMAC_KEY).unwrap();
    assert_eq!(
        hex::encode(packet.to_bytes()),
        canonical["expected_packet"].as_str().unwrap()
    );
}

#[test]
fn verified_packets_survive_the_full_verifier() {
    // Every vector packet must also pass the receive-side verifier under
    // its own key.
    for v in &vectors() {
        let key: [u8; 32] = hex::decode(v["key"].as_str().unwrap())
            .unwrap()
            .try_into()
            .unwrap();
        let bytes = hex::decode(v["expected_packet"].as_str().unwrap()).unwrap();
        assert!(
            yx_core::simple::verify_packet(&bytes, &key),
            "vector '{}' failed verification",
            v["name"].as_str().unwrap()
        );
    }
}
