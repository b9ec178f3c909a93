//! Real-time scheduling primitives.
//!
//! The publisher's tick loop must not drift: each wake time is the
//! previous wake time plus the sample period, which requires an
//! absolute-deadline sleep, not a relative one. On Linux that is
//! `clock_nanosleep(CLOCK_MONOTONIC, TIMER_ABSTIME)`; elsewhere a
//! computed-delta sleep approximates it well enough for development.
//!
//! [`Clock`] is a trait so the replay loop runs against a virtual clock in
//! tests and the real monotonic clock in production.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RtError {
    #[error("failed to set real-time priority {priority}: {source}")]
    Priority {
        priority: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock memory: {source}")]
    MemoryLock {
        #[source]
        source: std::io::Error,
    },

    #[error("real-time scheduling is not supported on this platform")]
    Unsupported,
}

/// Monotonic time source with absolute-deadline sleep.
pub trait Clock: Send + Sync {
    /// Nanoseconds on a monotonic timeline. The zero point is arbitrary;
    /// only differences and deadlines derived from `now_ns` are
    /// meaningful.
    fn now_ns(&self) -> u64;

    /// Sleep until the absolute deadline. Returns immediately when the
    /// deadline has already passed.
    fn sleep_until_ns(&self, deadline_ns: u64);
}

/// The operating system's monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

#[cfg(target_os = "linux")]
impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // CLOCK_MONOTONIC cannot fail with a valid timespec pointer.
        unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
    }

    fn sleep_until_ns(&self, deadline_ns: u64) {
        let ts = libc::timespec {
            tv_sec: (deadline_ns / 1_000_000_000) as libc::time_t,
            tv_nsec: (deadline_ns % 1_000_000_000) as libc::c_long,
        };
        loop {
            let rc = unsafe {
                libc::clock_nanosleep(
                    libc::CLOCK_MONOTONIC,
                    libc::TIMER_ABSTIME,
                    &ts,
                    std::ptr::null_mut(),
                )
            };
            // Re-arm on signal interruption; the deadline is absolute so
            // no time is lost.
            if rc != libc::EINTR {
                break;
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        use once_cell::sync::Lazy;
        use std::time::Instant;
        static START: Lazy<Instant> = Lazy::new(Instant::now);
        START.elapsed().as_nanos() as u64
    }

    fn sleep_until_ns(&self, deadline_ns: u64) {
        let now = self.now_ns();
        if deadline_ns > now {
            std::thread::sleep(std::time::Duration::from_nanos(deadline_ns - now));
        }
    }
}

/// Move the calling thread onto the SCHED_FIFO real-time scheduler.
///
/// Requires CAP_SYS_NICE; callers treat failure as a logged warning and
/// run at default priority.
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> Result<(), RtError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(RtError::Priority {
            priority,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> Result<(), RtError> {
    Err(RtError::Unsupported)
}

/// Pin current and future pages into RAM so the hot loops never take a
/// major fault mid-tick. Best effort: requires CAP_IPC_LOCK.
#[cfg(target_os = "linux")]
pub fn lock_memory() -> Result<(), RtError> {
    let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    if rc != 0 {
        return Err(RtError::MemoryLock {
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn lock_memory() -> Result<(), RtError> {
    Err(RtError::Unsupported)
}

/// A clock that never waits: `sleep_until_ns` jumps straight to the
/// deadline. Lets the replay loop run its full schedule in tests without
/// consuming wall time.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now_ns: std::sync::atomic::AtomicU64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for VirtualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(std::sync::atomic::Ordering::Acquire)
    }

    fn sleep_until_ns(&self, deadline_ns: u64) {
        // Time only moves forward.
        self.now_ns
            .fetch_max(deadline_ns, std::sync::atomic::Ordering::AcqRel);
    }
}
