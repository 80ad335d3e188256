//! One-shot senders. Built on the stateless simple builder so the emitted
//! bytes are exactly what any conforming implementation would produce.

use anyhow::{Context, Result};

use yx_core::config::YxConfig;
use yx_core::simple;
use yx_core::wire::OPT_ENCRYPTED;
use yx_net::UdpTransport;

use super::{TEST_AEAD_KEY, TEST_GUID, TEST_HMAC_KEY};

async fn ephemeral_transport() -> Result<UdpTransport> {
    let config = YxConfig {
        listen_addr: "0.0.0.0".to_string(),
        listen_port: 0,
        ..YxConfig::default()
    };
    UdpTransport::bind(&config)
        .await
        .context("failed to bind sender socket")
}

/// Emit one Protocol 0 datagram and print SENT.
pub async fn cmd_send_text(host: &str, port: u16, message: Option<&str>) -> Result<()> {
    let value: serde_json::Value = match message {
        Some(text) => serde_json::from_str(text).context("--message is not valid JSON")?,
        None => serde_json::json!({ "method": "test", "params": { "value": 42 } }),
    };

    let bytes = simple::build_text_packet(&value, &TEST_GUID, &TEST_HMAC_KEY)
        .context("failed to build text packet")?;

    let transport = ephemeral_transport().await?;
    transport
        .send(&bytes, host, port)
        .await
        .context("send failed")?;

    tracing::info!(bytes = bytes.len(), host, port, "text packet emitted");
    println!("SENT");
    Ok(())
}

/// Emit one chunked Protocol 1 message and print SENT.
pub async fn cmd_send_binary(
    host: &str,
    port: u16,
    size: usize,
    fill: u8,
    opts: u8,
    channel: u16,
    chunk_size: usize,
) -> Result<()> {
    let data = vec![fill; size];
    let enc_key = (opts & OPT_ENCRYPTED != 0).then_some(&TEST_AEAD_KEY[..]);

    let packets = simple::build_binary_packets(
        &data,
        &TEST_GUID,
        &TEST_HMAC_KEY,
        opts,
        enc_key,
        channel,
        0,
        chunk_size,
    )
    .context("failed to build binary packets")?;

    let transport = ephemeral_transport().await?;
    for packet in &packets {
        transport
            .send(packet, host, port)
            .await
            .context("send failed")?;
    }

    tracing::info!(
        bytes = size,
        chunks = packets.len(),
        opts,
        channel,
        "binary message emitted"
    );
    println!("SENT");
    Ok(())
}
