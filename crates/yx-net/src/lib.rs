//! yx-net — the UDP transport and the per-datagram receive pipeline.
//!
//! The transport owns the socket; the pipeline borrows the admission
//! components (key store, replay cache, rate limiter) and orders the
//! checks every received datagram must pass before protocol dispatch.

pub mod faillog;
pub mod pipeline;
pub mod transport;

pub use faillog::FailureLog;
pub use pipeline::{Disposition, ReceivePipeline};
pub use transport::UdpTransport;
