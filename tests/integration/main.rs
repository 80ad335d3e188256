//! YX integration test harness.
//!
//! End-to-end scenarios over loopback UDP: each test stands up one or two
//! full receive pipelines on ephemeral ports and drives them with real
//! datagrams. No external environment is required.

use std::sync::{mpsc, Arc};
use std::time::Duration;

pub use serde_json::Value;
pub use yx_core::config::YxConfig;
pub use yx_net::{Disposition, ReceivePipeline, UdpTransport};

use yx_proto::{BinaryConfig, BinaryProtocol, KeyStore, ProtocolRouter, TextProtocol};

mod admission;
mod binary_transfer;
mod conformance;
mod text_rpc;

// ── Test identity ─────────────────────────────────────────────────────────────

pub const TEST_GUID: [u8; 6] = [0x01; 6];
pub const OTHER_GUID: [u8; 6] = [0x02; 6];
pub const TEST_HMAC_KEY: [u8; 32] = [0x00; 32];
pub const TEST_AEAD_KEY: [u8; 32] = [0x42; 32];

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// ── Loopback peer ─────────────────────────────────────────────────────────────

/// One full receiver: transport + pipeline + delivery channels.
pub struct Peer {
    pub transport: UdpTransport,
    pub pipeline: ReceivePipeline,
    pub text_rx: mpsc::Receiver<Value>,
    pub binary_rx: mpsc::Receiver<(u16, Vec<u8>)>,
    pub port: u16,
}

impl Peer {
    /// Receive one datagram and run it through the pipeline.
    pub async fn process_one(&self) -> anyhow::Result<Disposition> {
        let (bytes, src) = self.transport.recv(RECV_TIMEOUT).await?;
        Ok(self.pipeline.process(&bytes, src))
    }
}

fn loopback_config(tag: &str) -> YxConfig {
    YxConfig {
        listen_addr: "127.0.0.1".to_string(),
        listen_port: 0,
        failure_log_path: std::env::temp_dir().join(format!(
            "yx-integration-faillog-{tag}-{}",
            std::process::id()
        )),
        ..YxConfig::default()
    }
}

/// Stand up a peer with both protocols registered, using `config` for
/// every tunable except the bind address (always loopback, port 0).
pub async fn peer_with_config(mut config: YxConfig) -> anyhow::Result<Peer> {
    config.listen_addr = "127.0.0.1".to_string();
    config.listen_port = 0;

    let (text_tx, text_rx) = mpsc::channel();
    let (binary_tx, binary_rx) = mpsc::channel();

    let text = TextProtocol::new(Box::new(move |value| {
        let _ = text_tx.send(value);
        Ok(())
    }));
    let binary = BinaryProtocol::new(
        BinaryConfig {
            chunk_size: config.chunk_size,
            buffer_timeout: config.buffer_timeout(),
            dedup_window: config.dedup_window(),
        },
        Some(TEST_AEAD_KEY),
        Box::new(move |channel, data| {
            let _ = binary_tx.send((channel, data));
            Ok(())
        }),
    )?;

    let mut router = ProtocolRouter::new();
    router.register(Arc::new(text));
    router.register(Arc::new(binary));

    let keystore = Arc::new(
        KeyStore::new(&TEST_HMAC_KEY)?.with_encryption_key(&TEST_AEAD_KEY)?,
    );

    let transport = UdpTransport::bind(&config).await?;
    let port = transport.local_addr()?.port();
    let pipeline = ReceivePipeline::new(&config, keystore, router, TEST_GUID)?;

    Ok(Peer {
        transport,
        pipeline,
        text_rx,
        binary_rx,
        port,
    })
}

pub async fn peer(tag: &str) -> anyhow::Result<Peer> {
    peer_with_config(loopback_config(tag)).await
}

/// An ephemeral sender socket.
pub async fn sender() -> anyhow::Result<UdpTransport> {
    let config = YxConfig {
        listen_addr: "127.0.0.1".to_string(),
        listen_port: 0,
        ..YxConfig::default()
    };
    Ok(UdpTransport::bind(&config).await?)
}
