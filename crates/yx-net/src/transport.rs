//! UDP socket ownership.
//!
//! The socket is built with socket2 so address/port reuse and the
//! broadcast flag can be set before bind — multiple cooperating receivers
//! may share one port on one host — then handed to tokio for async IO.

use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use yx_core::config::YxConfig;

/// Receive buffer size. Any datagram a YX peer can legally emit fits.
const RECV_BUF: usize = 65_536;

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind per the config's listen address/port and socket flags.
    pub async fn bind(config: &YxConfig) -> Result<Self, TransportError> {
        let ip: std::net::IpAddr = config
            .listen_addr
            .parse()
            .map_err(|_| TransportError::BadAddress(config.listen_addr.clone()))?;
        let addr = SocketAddr::new(ip, config.listen_port);

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        if config.reuse_port {
            socket.set_reuse_port(true)?;
        }
        socket.set_broadcast(config.broadcast)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        let socket = UdpSocket::from_std(socket.into())?;
        let local = socket.local_addr()?;

        tracing::info!(
            addr = %local,
            broadcast = config.broadcast,
            reuse_port = config.reuse_port,
            "transport bound"
        );
        Ok(Self { socket })
    }

    /// One `sendto`. The bytes are a fully built packet.
    pub async fn send(&self, bytes: &[u8], host: &str, port: u16) -> Result<usize, TransportError> {
        Ok(self.socket.send_to(bytes, (host, port)).await?)
    }

    /// Await one datagram, up to `timeout`.
    pub async fn recv(&self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        let mut buf = vec![0u8; RECV_BUF];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Err(_) => Err(TransportError::Timeout),
            Ok(Err(e)) => Err(TransportError::Io(e)),
            Ok(Ok((len, src))) => {
                buf.truncate(len);
                Ok((buf, src))
            }
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unparseable listen address: {0}")]
    BadAddress(String),

    #[error("receive timed out")]
    Timeout,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
