//! yx-proto — protocol state machines and admission components.
//!
//! Everything between an authenticated packet and the application callback:
//! key store, replay cache, rate limiter, first-byte router, and the two
//! wire protocols (text 0x00, chunked binary 0x01).

pub mod binary;
pub mod keystore;
pub mod ratelimit;
pub mod replay;
pub mod router;
pub mod text;

pub use binary::{BinaryConfig, BinaryProtocol};
pub use keystore::KeyStore;
pub use ratelimit::RateLimiter;
pub use replay::ReplayCache;
pub use router::{BoxError, Protocol, ProtocolRouter};
pub use text::TextProtocol;
