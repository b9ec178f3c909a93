//! # iedsim Network Layer
//!
//! ## Purpose
//!
//! The boundary between the emulator and the operating system: raw
//! link-layer frame transport, real-time scheduling primitives, and
//! lock-free transport statistics. Everything above this crate is
//! deterministic and testable; everything OS-specific lives here behind
//! small traits.
//!
//! ## Architecture Role
//!
//! ```text
//! services/emulator → [libs/network] → NIC / scheduler
//!        ↓                  ↓
//!   FrameTransport     AF_PACKET socket (Linux)
//!   Clock              clock_nanosleep TIMER_ABSTIME
//!   TransportStats     Loopback pair (tests)
//! ```
//!
//! The publisher and sniffer hot loops hold a `FrameTransport` and a
//! `Clock` and never touch a syscall directly, which is what lets the
//! end-to-end tests run the same loops against a loopback pair and a
//! virtual clock.

pub mod error;
pub mod loopback;
#[cfg(target_os = "linux")]
pub mod raw;
pub mod rt;
pub mod stats;
pub mod transport;

pub use error::{TransportError, TransportResult};
pub use loopback::Loopback;
#[cfg(target_os = "linux")]
pub use raw::RawSocket;
pub use rt::{lock_memory, set_realtime_priority, Clock, MonotonicClock, RtError, VirtualClock};
pub use stats::{StatsSnapshot, TransportStats};
pub use transport::FrameTransport;
