//! Forensic log of failed MAC verifications.
//!
//! Append-only text file, one record per failure: microsecond timestamp,
//! source host/port, parsed GUID, expected and received MAC, full packet
//! hex. Never keys, never plaintext. The handle stays in append mode so
//! external rotation and concurrent writers are tolerated; writes are
//! serialized per process by a mutex on the handle.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use yx_core::guid;
use yx_core::packet::AuthFailure;

pub struct FailureLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FailureLog {
    pub fn open(path: &Path) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one failure record. A write error is logged and swallowed —
    /// forensics must never take down the receive loop.
    pub fn record(&self, src: &SocketAddr, failure: &AuthFailure, packet: &[u8]) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let line = format!(
            "{}.{:06} src={} guid={} expected_mac={} received_mac={} packet={}\n",
            now.as_secs(),
            now.subsec_micros(),
            src,
            guid::to_hex(&failure.guid),
            hex::encode(failure.expected_mac),
            hex::encode(failure.received_mac),
            hex::encode(packet),
        );

        let mut file = self.file.lock().expect("failure log mutex poisoned");
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append forensic record");
        }
    }
}
