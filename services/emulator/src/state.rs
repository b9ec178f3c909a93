//! Shared runtime state: digital inputs, stop/trip flags, counters.
//!
//! One [`SharedState`] handle is wired into every component at startup;
//! there are no ambient globals. The sniffer thread writes digital inputs
//! with Release ordering and the publisher (or any other consumer) reads
//! them with Acquire, so a reader always sees either the old or the fully
//! written new value. Counters are Relaxed: they order nothing, they only
//! count.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

/// Number of digital-input slots. Fixed so the array is a flat block of
/// atomics, never resized or locked.
pub const MAX_DIGITAL_INPUTS: usize = 32;

/// Fixed array of independently atomic digital-input slots.
#[derive(Debug)]
pub struct DigitalInputs {
    slots: [AtomicU8; MAX_DIGITAL_INPUTS],
}

impl DigitalInputs {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU8::new(0)),
        }
    }

    /// Store a slot (Release). Out-of-range indices are ignored; callers
    /// validate mappings at configuration time.
    #[inline]
    pub fn set(&self, index: usize, value: bool) {
        if let Some(slot) = self.slots.get(index) {
            slot.store(value as u8, Ordering::Release);
        }
    }

    /// Load a slot (Acquire). Out of range reads as `false`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .map(|slot| slot.load(Ordering::Acquire) != 0)
            .unwrap_or(false)
    }
}

/// Process-wide counters, one handle injected everywhere that counts.
#[derive(Debug, Default)]
pub struct EmulatorStats {
    pub frames_published: AtomicU64,
    pub publish_errors: AtomicU64,
    pub frames_seen: AtomicU64,
    pub frames_matched: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub parse_errors: AtomicU64,
    pub evaluations: AtomicU64,
    pub trips: AtomicU64,
}

impl EmulatorStats {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// A trip decision, recorded for consumers to read after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripEvent {
    pub rule: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// The one shared handle joining publisher, sniffer, and evaluator.
#[derive(Debug)]
pub struct SharedState {
    pub inputs: DigitalInputs,
    pub stats: EmulatorStats,
    stop: AtomicBool,
    trip: AtomicBool,
    trip_events: Mutex<Vec<TripEvent>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            inputs: DigitalInputs::new(),
            stats: EmulatorStats::default(),
            stop: AtomicBool::new(false),
            trip: AtomicBool::new(false),
            trip_events: Mutex::new(Vec::new()),
        }
    }

    /// Ask both loops to exit. Cooperative: expect up to one receive
    /// timeout or one sample period of latency before they do.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    #[inline]
    pub fn trip_active(&self) -> bool {
        self.trip.load(Ordering::Acquire)
    }

    /// Record a trip: sets the flag, appends the event. Called from the
    /// sniffer thread after evaluation, outside the per-frame hot path.
    pub fn record_trip(&self, event: TripEvent) {
        self.trip.store(true, Ordering::Release);
        EmulatorStats::bump(&self.stats.trips);
        self.trip_events.lock().push(event);
    }

    pub fn trip_events(&self) -> Vec<TripEvent> {
        self.trip_events.lock().clone()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
