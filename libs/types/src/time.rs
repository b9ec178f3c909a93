//! IEC 61850 UTC timestamps.
//!
//! The wire format carries seconds since the Unix epoch plus a fractional
//! second scaled to a 32-bit fixed-point fraction: `fraction / 2^32` of a
//! second. Eight bytes total, both halves big-endian.

use crate::TypesError;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Seconds-plus-fraction UTC timestamp as encoded in GOOSE `t` and SV
/// `RefrTm` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UtcTimestamp {
    pub seconds: u32,
    /// Fractional second scaled by 2^32.
    pub fraction: u32,
}

impl UtcTimestamp {
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        Self { seconds, fraction }
    }

    /// Convert a wall-clock time. Times before the epoch are unencodable.
    pub fn from_system_time(t: SystemTime) -> Result<Self, TypesError> {
        let since_epoch = t
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TypesError::TimestampBeforeEpoch)?;
        Ok(Self::from_duration(since_epoch))
    }

    /// Convert a duration since the epoch.
    pub fn from_duration(since_epoch: Duration) -> Self {
        let fraction = ((since_epoch.subsec_nanos() as u64) << 32) / NANOS_PER_SEC;
        Self {
            seconds: since_epoch.as_secs() as u32,
            fraction: fraction as u32,
        }
    }

    /// Seconds since the epoch, fractional part included.
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + self.fraction as f64 / (1u64 << 32) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_second_maps_to_half_of_u32_range() {
        let ts = UtcTimestamp::from_duration(Duration::new(100, 500_000_000));
        assert_eq!(ts.seconds, 100);
        // 0.5 s scales to 2^31, minus at most one ulp of rounding down
        assert!((ts.fraction as i64 - (1i64 << 31)).abs() <= 1);
    }

    #[test]
    fn zero_fraction_for_whole_seconds() {
        let ts = UtcTimestamp::from_duration(Duration::from_secs(1_700_000_000));
        assert_eq!(ts.fraction, 0);
        assert_eq!(ts.as_secs_f64(), 1_700_000_000.0);
    }

    #[test]
    fn rejects_pre_epoch_times() {
        let before = UNIX_EPOCH - Duration::from_secs(1);
        assert!(UtcTimestamp::from_system_time(before).is_err());
    }
}
