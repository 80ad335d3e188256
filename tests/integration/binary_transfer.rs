//! Scenarios S3/S4 — chunked binary over loopback, plain and encrypted,
//! plus the compressed and compressed+encrypted combinations.

use crate::*;
use yx_core::simple;
use yx_core::wire::{CHUNK_HEADER_LEN, NONCE_LEN, OPT_COMPRESSED, OPT_ENCRYPTED, PACKET_MIN, TAG_LEN};

async fn send_all(
    sender_socket: &UdpTransport,
    packets: &[Vec<u8>],
    port: u16,
) -> anyhow::Result<()> {
    for p in packets {
        sender_socket.send(p, "127.0.0.1", port).await?;
    }
    Ok(())
}

#[tokio::test]
async fn chunked_base_transfer_emits_three_datagrams() -> anyhow::Result<()> {
    let receiver = peer("binary-s3").await?;
    let sender_socket = sender().await?;

    let data = vec![0xAB; 2500];
    let packets = simple::build_binary_packets(
        &data,
        &TEST_GUID,
        &TEST_HMAC_KEY,
        0,
        None,
        0,
        0,
        1024,
    )?;
    assert_eq!(packets.len(), 3, "2500 bytes at 1024 per chunk");

    send_all(&sender_socket, &packets, receiver.port).await?;
    for _ in 0..3 {
        assert_eq!(receiver.process_one().await?, Disposition::Routed);
    }

    let (channel, delivered) = receiver.binary_rx.try_recv()?;
    assert_eq!(channel, 0);
    assert_eq!(delivered, data);
    assert!(receiver.binary_rx.try_recv().is_err(), "exactly one message");
    Ok(())
}

#[tokio::test]
async fn encrypted_transfer_hides_plaintext_and_differs_per_send() -> anyhow::Result<()> {
    let receiver = peer("binary-s4").await?;
    let sender_socket = sender().await?;

    let data: Vec<u8> = (0..100).map(|_| rand::random::<u8>()).collect();

    let first = simple::build_binary_packets(
        &data,
        &TEST_GUID,
        &TEST_HMAC_KEY,
        OPT_ENCRYPTED,
        Some(&TEST_AEAD_KEY),
        0,
        0,
        1024,
    )?;
    let second = simple::build_binary_packets(
        &data,
        &TEST_GUID,
        &TEST_HMAC_KEY,
        OPT_ENCRYPTED,
        Some(&TEST_AEAD_KEY),
        0,
        1,
        1024,
    )?;

    // One chunk each: nonce + ciphertext + tag rides inside it.
    assert_eq!(first.len(), 1);
    let body = &first[0][PACKET_MIN + CHUNK_HEADER_LEN..];
    assert_eq!(body.len(), NONCE_LEN + data.len() + TAG_LEN);
    assert_ne!(&body[NONCE_LEN..NONCE_LEN + data.len()], &data[..]);

    // Same plaintext, fresh nonce, different wire bytes.
    let body2 = &second[0][PACKET_MIN + CHUNK_HEADER_LEN..];
    assert_ne!(body, body2);

    send_all(&sender_socket, &first, receiver.port).await?;
    send_all(&sender_socket, &second, receiver.port).await?;
    receiver.process_one().await?;
    receiver.process_one().await?;

    assert_eq!(receiver.binary_rx.try_recv()?.1, data);
    assert_eq!(receiver.binary_rx.try_recv()?.1, data);
    Ok(())
}

#[tokio::test]
async fn compressed_and_combined_transfers_round_trip() -> anyhow::Result<()> {
    let receiver = peer("binary-combos").await?;
    let sender_socket = sender().await?;

    let data = b"repetitive payload ".repeat(400);

    for (sequence, opts) in [(0u32, OPT_COMPRESSED), (1, OPT_COMPRESSED | OPT_ENCRYPTED)] {
        let packets = simple::build_binary_packets(
            &data,
            &TEST_GUID,
            &TEST_HMAC_KEY,
            opts,
            Some(&TEST_AEAD_KEY),
            5,
            sequence,
            1024,
        )?;
        // Highly repetitive input must actually shrink on the wire.
        let wire_bytes: usize = packets.iter().map(|p| p.len()).sum();
        assert!(wire_bytes < data.len(), "opts={opts:#04x} did not compress");

        send_all(&sender_socket, &packets, receiver.port).await?;
        for _ in 0..packets.len() {
            receiver.process_one().await?;
        }
        assert_eq!(receiver.binary_rx.try_recv()?, (5, data.clone()), "opts={opts:#04x}");
    }
    Ok(())
}

#[tokio::test]
async fn chunks_arriving_out_of_order_still_assemble() -> anyhow::Result<()> {
    let receiver = peer("binary-ooo").await?;
    let sender_socket = sender().await?;

    let data: Vec<u8> = (0..4000u32).map(|i| (i % 256) as u8).collect();
    let mut packets = simple::build_binary_packets(
        &data,
        &TEST_GUID,
        &TEST_HMAC_KEY,
        0,
        None,
        1,
        0,
        1024,
    )?;
    packets.reverse();

    send_all(&sender_socket, &packets, receiver.port).await?;
    for _ in 0..packets.len() {
        receiver.process_one().await?;
    }

    assert_eq!(receiver.binary_rx.try_recv()?.1, data);
    Ok(())
}
