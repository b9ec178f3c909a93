//! Transport-layer errors.
//!
//! Open/configuration failures are fatal to the operation that raised
//! them; send/receive failures in the hot loops are logged, counted in
//! [`crate::TransportStats`], and never terminate the owning thread.

use thiserror::Error;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening or binding the transport failed
    #[error("failed to open transport on '{interface}': {source}")]
    Open {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    /// Named network interface does not exist
    #[error("network interface '{name}' not found")]
    InterfaceNotFound { name: String },

    /// Send primitive failed
    #[error("frame send failed: {source}")]
    Send {
        #[source]
        source: std::io::Error,
    },

    /// Receive primitive failed (timeouts are not errors)
    #[error("frame receive failed: {source}")]
    Recv {
        #[source]
        source: std::io::Error,
    },

    /// Transport configuration change failed
    #[error("failed to set {what}: {source}")]
    Configure {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Peer side of a loopback pair is gone
    #[error("loopback peer disconnected")]
    PeerDisconnected,
}
