//! Scenarios S5/S6 — replay suppression and rate limiting at the
//! pipeline boundary, with real datagrams.

use crate::*;
use yx_core::simple;

#[tokio::test]
async fn replayed_datagram_dropped_then_admitted_after_window() -> anyhow::Result<()> {
    let config = YxConfig {
        replay_max_age_secs: 0.2,
        ..YxConfig::default()
    };
    let receiver = peer_with_config(YxConfig {
        failure_log_path: std::env::temp_dir().join(format!(
            "yx-admission-replay-{}",
            std::process::id()
        )),
        ..config
    })
    .await?;
    let sender_socket = sender().await?;

    let msg = serde_json::json!({"method": "once"});
    let bytes = simple::build_text_packet(&msg, &TEST_GUID, &TEST_HMAC_KEY)?;

    // First arrival delivers.
    sender_socket.send(&bytes, "127.0.0.1", receiver.port).await?;
    assert_eq!(receiver.process_one().await?, Disposition::Routed);
    assert_eq!(receiver.text_rx.try_recv()?, msg);

    // Captured-and-resent copy is suppressed.
    sender_socket.send(&bytes, "127.0.0.1", receiver.port).await?;
    assert_eq!(receiver.process_one().await?, Disposition::Replayed);
    assert!(receiver.text_rx.try_recv().is_err());

    // Outside the retention window the nonce is admissible again.
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    sender_socket.send(&bytes, "127.0.0.1", receiver.port).await?;
    assert_eq!(receiver.process_one().await?, Disposition::Routed);
    assert_eq!(receiver.text_rx.try_recv()?, msg);
    Ok(())
}

#[tokio::test]
async fn sixth_packet_rate_limited_while_other_peer_unaffected() -> anyhow::Result<()> {
    let receiver = peer_with_config(YxConfig {
        max_requests: 5,
        failure_log_path: std::env::temp_dir().join(format!(
            "yx-admission-ratelimit-{}",
            std::process::id()
        )),
        ..YxConfig::default()
    })
    .await?;
    let sender_socket = sender().await?;

    let packet_from = |guid: &[u8; 6], value: u64| {
        simple::build_text_packet(&serde_json::json!({ "n": value }), guid, &TEST_HMAC_KEY)
    };

    // Peer P: five delivered, the sixth dropped.
    for value in 0..5 {
        sender_socket
            .send(&packet_from(&TEST_GUID, value)?, "127.0.0.1", receiver.port)
            .await?;
        assert_eq!(receiver.process_one().await?, Disposition::Routed);
    }
    sender_socket
        .send(&packet_from(&TEST_GUID, 5)?, "127.0.0.1", receiver.port)
        .await?;
    assert_eq!(receiver.process_one().await?, Disposition::RateLimited);

    // Peer Q proceeds independently until its own five are spent.
    for value in 0..5 {
        sender_socket
            .send(&packet_from(&OTHER_GUID, value)?, "127.0.0.1", receiver.port)
            .await?;
        assert_eq!(receiver.process_one().await?, Disposition::Routed);
    }
    sender_socket
        .send(&packet_from(&OTHER_GUID, 5)?, "127.0.0.1", receiver.port)
        .await?;
    assert_eq!(receiver.process_one().await?, Disposition::RateLimited);
    Ok(())
}

#[tokio::test]
async fn trusted_guid_exempt_from_rate_limit() -> anyhow::Result<()> {
    let receiver = peer_with_config(YxConfig {
        max_requests: 1,
        trusted_guids: vec![hex::encode(TEST_GUID)],
        failure_log_path: std::env::temp_dir().join(format!(
            "yx-admission-trusted-{}",
            std::process::id()
        )),
        ..YxConfig::default()
    })
    .await?;
    let sender_socket = sender().await?;

    for value in 0..8u64 {
        let bytes =
            simple::build_text_packet(&serde_json::json!({ "n": value }), &TEST_GUID, &TEST_HMAC_KEY)?;
        sender_socket.send(&bytes, "127.0.0.1", receiver.port).await?;
        assert_eq!(receiver.process_one().await?, Disposition::Routed);
    }
    Ok(())
}

#[tokio::test]
async fn forged_datagram_leaves_a_forensic_record() -> anyhow::Result<()> {
    let faillog = std::env::temp_dir().join(format!("yx-admission-forensic-{}", std::process::id()));
    let _ = std::fs::remove_file(&faillog);

    let receiver = peer_with_config(YxConfig {
        failure_log_path: faillog.clone(),
        ..YxConfig::default()
    })
    .await?;
    let sender_socket = sender().await?;

    let mut bytes =
        simple::build_text_packet(&serde_json::json!({ "n": 1 }), &TEST_GUID, &TEST_HMAC_KEY)?;
    bytes[3] ^= 0xFF;

    sender_socket.send(&bytes, "127.0.0.1", receiver.port).await?;
    assert_eq!(receiver.process_one().await?, Disposition::AuthFailure);

    let log = std::fs::read_to_string(&faillog)?;
    assert!(log.contains("guid=010101010101"));
    assert!(log.contains(&format!("packet={}", hex::encode(&bytes))));

    let _ = std::fs::remove_file(&faillog);
    Ok(())
}
