//! The raw-socket-like primitive the emulator's hot loops are written
//! against.

use crate::TransportResult;
use std::time::Duration;

/// Byte-buffer send/receive with a settable receive timeout.
///
/// The receive timeout exists so the owning thread re-checks its stop flag
/// at a bounded interval; it is not a protocol timeout. `recv` returns
/// `Ok(None)` on timeout, `Ok(Some(n))` with the frame length on receipt.
///
/// Implementations must be usable from a single dedicated thread without
/// per-call allocation.
pub trait FrameTransport: Send {
    fn send(&self, frame: &[u8]) -> TransportResult<()>;

    fn recv(&self, buf: &mut [u8]) -> TransportResult<Option<usize>>;

    fn set_recv_timeout(&self, timeout: Duration) -> TransportResult<()>;
}
