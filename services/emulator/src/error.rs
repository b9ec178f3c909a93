//! Runtime errors for the virtual IED.
//!
//! Everything here is a configuration-time failure surfaced before any
//! frame is sent. Hot-loop send/receive failures never become errors of
//! this type: they are logged, counted in [`crate::EmulatorStats`], and
//! the loop continues.

use codec::CodecError;
use network::TransportError;
use thiserror::Error;

pub type EmulatorResult<T> = std::result::Result<T, EmulatorError>;

#[derive(Debug, Error)]
pub enum EmulatorError {
    /// The sample source has no channels or no samples
    #[error("sample source is empty: {reason}")]
    EmptySource { reason: &'static str },

    /// Source channel count disagrees with the stream configuration
    #[error("sample source has {source_channels} channels, stream configured for {configured}")]
    ChannelCountMismatch {
        source_channels: usize,
        configured: usize,
    },

    /// Interval replay mode is reserved but not implemented
    #[error("interval replay mode is not implemented")]
    IntervalModeUnsupported,

    /// A periodic loop cannot run at zero frequency
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    /// Subscription maps a payload entry to a digital-input slot that
    /// does not exist
    #[error("subscription channel index {index} out of range (digital inputs: {max})")]
    InputIndexOutOfRange { index: usize, max: usize },

    /// Frame encoding failed at plan construction
    #[error("frame encoding failed: {0}")]
    Codec(#[from] CodecError),

    /// Transport setup failed before the loop started
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}
