//! One-shot receiver: full pipeline, first delivered message wins.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use yx_core::config::YxConfig;
use yx_net::{ReceivePipeline, UdpTransport};
use yx_proto::{BinaryConfig, BinaryProtocol, KeyStore, ProtocolRouter, TextProtocol};

use super::{TEST_AEAD_KEY, TEST_GUID, TEST_HMAC_KEY};

/// Bind the harness port, await one delivered message, print RECEIVED.
/// On timeout (or bind failure) print FAILED: <reason> and exit non-zero.
pub async fn cmd_recv(port: u16, timeout_secs: f64) -> Result<()> {
    let config = YxConfig {
        listen_port: port,
        ..YxConfig::default()
    };

    let transport = match UdpTransport::bind(&config).await {
        Ok(t) => t,
        Err(e) => {
            println!("FAILED: bind: {e}");
            std::process::exit(1);
        }
    };

    // Both protocols report upward through one channel; whichever message
    // completes first satisfies the harness.
    let (delivered_tx, delivered_rx) = mpsc::channel::<String>();

    let text_tx = delivered_tx.clone();
    let text = TextProtocol::new(Box::new(move |value| {
        let _ = text_tx.send(format!("text {value}"));
        Ok(())
    }));

    let binary_tx = delivered_tx;
    let binary = BinaryProtocol::new(
        BinaryConfig {
            chunk_size: config.chunk_size,
            buffer_timeout: config.buffer_timeout(),
            dedup_window: config.dedup_window(),
        },
        Some(TEST_AEAD_KEY),
        Box::new(move |channel, data| {
            let _ = binary_tx.send(format!("binary channel={channel} bytes={}", data.len()));
            Ok(())
        }),
    )
    .context("binary protocol construction failed")?;

    let mut router = ProtocolRouter::new();
    router.register(Arc::new(text));
    router.register(Arc::new(binary));

    let keystore = Arc::new(
        KeyStore::new(&TEST_HMAC_KEY)
            .context("keystore construction failed")?
            .with_encryption_key(&TEST_AEAD_KEY)
            .context("keystore construction failed")?,
    );

    let pipeline = ReceivePipeline::new(&config, keystore, router, TEST_GUID)
        .context("pipeline construction failed")?;

    let deadline = Instant::now() + Duration::from_secs_f64(timeout_secs);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match transport.recv(remaining).await {
            Ok((bytes, src)) => {
                let disposition = pipeline.process(&bytes, src);
                tracing::debug!(?disposition, %src, len = bytes.len(), "datagram processed");

                if let Ok(summary) = delivered_rx.try_recv() {
                    tracing::info!(summary, "message delivered");
                    println!("RECEIVED");
                    return Ok(());
                }
            }
            Err(yx_net::transport::TransportError::Timeout) => break,
            Err(e) => {
                println!("FAILED: recv: {e}");
                std::process::exit(1);
            }
        }
    }

    println!("FAILED: timeout waiting for a message");
    std::process::exit(1);
}
