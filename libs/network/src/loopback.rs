//! In-memory transport pair for tests and end-to-end wiring.
//!
//! Frames sent on one end arrive on the other, whole and in order, with
//! the same timeout semantics as the raw socket. This is what lets the
//! publisher and sniffer loops run unmodified in tests.

use crate::{FrameTransport, TransportError, TransportResult, TransportStats};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One end of an in-memory frame pipe.
pub struct Loopback {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    recv_timeout_ns: AtomicU64,
    stats: TransportStats,
}

impl Loopback {
    /// Create a connected pair. Frames sent on one end are received on
    /// the other.
    pub fn pair() -> (Loopback, Loopback) {
        let (a_tx, b_rx) = unbounded();
        let (b_tx, a_rx) = unbounded();
        (Self::end(a_tx, a_rx), Self::end(b_tx, b_rx))
    }

    fn end(tx: Sender<Vec<u8>>, rx: Receiver<Vec<u8>>) -> Self {
        Self {
            tx,
            rx,
            recv_timeout_ns: AtomicU64::new(Duration::from_millis(100).as_nanos() as u64),
            stats: TransportStats::new(),
        }
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

impl FrameTransport for Loopback {
    fn send(&self, frame: &[u8]) -> TransportResult<()> {
        self.tx.send(frame.to_vec()).map_err(|_| {
            self.stats.record_send_error();
            TransportError::PeerDisconnected
        })?;
        self.stats.record_send(frame.len());
        Ok(())
    }

    fn recv(&self, buf: &mut [u8]) -> TransportResult<Option<usize>> {
        let timeout = Duration::from_nanos(self.recv_timeout_ns.load(Ordering::Relaxed));
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => {
                let n = frame.len().min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
                self.stats.record_recv(n);
                Ok(Some(n))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // Peer dropped: report as a timeout so a polling receive
                // loop winds down through its normal stop-flag check.
                Ok(None)
            }
        }
    }

    fn set_recv_timeout(&self, timeout: Duration) -> TransportResult<()> {
        self.recv_timeout_ns
            .store(timeout.as_nanos() as u64, Ordering::Relaxed);
        Ok(())
    }
}
