//! # iedsim Virtual IED Runtime
//!
//! ## Purpose
//!
//! The emulated device itself: a Sampled-Value replay engine and a GOOSE
//! heartbeat publisher on the transmit side, a GOOSE sniffer feeding a
//! trip-rule evaluator on the receive side, joined by one shared-state
//! handle of atomics.
//!
//! ## Architecture Role
//!
//! ```text
//!  sample source ─► [SvReplay] ──────────► FrameTransport ─► wire
//!  digital inputs ─► [GooseHeartbeat] ───► FrameTransport ─► wire
//!
//!  wire ─► FrameTransport ─► [Sniffer] ─► digital inputs (atomic)
//!                                 │
//!                                 └─► [TripEvaluator] ─► trip flag/events
//! ```
//!
//! ## Concurrency Model
//!
//! Two long-lived dedicated threads (publisher and sniffer, distinct
//! real-time priorities, publisher higher) plus an ordinary thread for the
//! GOOSE heartbeat. They communicate only through [`SharedState`]:
//! atomically stored digital-input slots (sniffer writes Release, readers
//! load Acquire), a stop flag, and a trip flag. No locks, no allocation,
//! no file I/O inside a per-tick or per-frame hot path; cancellation is
//! cooperative, bounded by one receive timeout or one sample period.

pub mod error;
pub mod heartbeat;
pub mod publisher;
pub mod sniffer;
pub mod source;
pub mod state;
pub mod trip;

pub use error::{EmulatorError, EmulatorResult};
pub use heartbeat::GooseHeartbeat;
pub use publisher::{ReplayMode, ReplayReport, SvReplay};
pub use sniffer::{AnalysisSink, Sniffer, Subscription};
pub use source::{MemorySampleSource, SampleSource};
pub use state::{DigitalInputs, EmulatorStats, SharedState, TripEvent, MAX_DIGITAL_INPUTS};
pub use trip::{EvalOutcome, TripEvaluator};
