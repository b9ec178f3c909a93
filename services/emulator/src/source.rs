//! Channel sample sources.
//!
//! The replay engine consumes per-channel integer arrays already
//! resampled to the target SV rate; producing them (COMTRADE/CSV loading,
//! resampling) is a collaborator's job. [`MemorySampleSource`] is the
//! in-process implementation used by the binary's synthetic waveforms and
//! by tests.

use crate::{EmulatorError, EmulatorResult};

/// Per-channel integer samples at a known rate.
pub trait SampleSource: Send {
    /// Samples per second of the arrays, equal to the target SV rate.
    fn sample_rate(&self) -> u32;

    /// One array per channel, all the same length.
    fn channels(&self) -> &[Vec<i32>];

    /// Samples per channel.
    fn len(&self) -> usize {
        self.channels().first().map(Vec::len).unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sample arrays held in memory, validated rectangular at construction.
pub struct MemorySampleSource {
    rate: u32,
    channels: Vec<Vec<i32>>,
}

impl MemorySampleSource {
    pub fn new(rate: u32, channels: Vec<Vec<i32>>) -> EmulatorResult<Self> {
        if channels.is_empty() {
            return Err(EmulatorError::EmptySource {
                reason: "no channels",
            });
        }
        let len = channels[0].len();
        if len == 0 {
            return Err(EmulatorError::EmptySource {
                reason: "channels carry no samples",
            });
        }
        if channels.iter().any(|c| c.len() != len) {
            return Err(EmulatorError::EmptySource {
                reason: "channels have unequal lengths",
            });
        }
        Ok(Self { rate, channels })
    }

    /// Synthesize a sine wave on every channel, 120-degree phase steps
    /// between channels (a three-phase-ish default for standalone runs).
    pub fn sine(
        rate: u32,
        channel_count: usize,
        amplitude: i32,
        frequency_hz: f64,
        seconds: f64,
    ) -> EmulatorResult<Self> {
        let samples = (rate as f64 * seconds) as usize;
        if samples == 0 || channel_count == 0 {
            return Err(EmulatorError::EmptySource {
                reason: "zero duration or zero channels",
            });
        }
        let channels = (0..channel_count)
            .map(|ch| {
                let phase = (ch % 3) as f64 * (2.0 * std::f64::consts::PI / 3.0);
                (0..samples)
                    .map(|i| {
                        let t = i as f64 / rate as f64;
                        let angle = 2.0 * std::f64::consts::PI * frequency_hz * t + phase;
                        (amplitude as f64 * angle.sin()) as i32
                    })
                    .collect()
            })
            .collect();
        Self::new(rate, channels)
    }
}

impl SampleSource for MemorySampleSource {
    fn sample_rate(&self) -> u32 {
        self.rate
    }

    fn channels(&self) -> &[Vec<i32>] {
        &self.channels
    }
}
