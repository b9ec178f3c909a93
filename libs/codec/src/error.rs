//! Codec errors with diagnostic context.
//!
//! Decode errors carry the absolute byte offset and what was being parsed
//! there, so a malformed capture can be diagnosed from the log line alone.
//! Encode errors are construction-time failures surfaced to the caller
//! before anything is transmitted.

use thiserror::Error;
use types::TypesError;

/// Result alias for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Value length exceeds what the two-byte long form can express
    #[error("length {len} exceeds the maximum encodable TLV length {max}", max = crate::MAX_ENCODABLE_LEN)]
    LengthOverflow { len: usize },

    /// Buffer ended before the structure it declared
    #[error("truncated frame: need {need} bytes, have {got} (offset {offset}, while {context})")]
    Truncated {
        need: usize,
        got: usize,
        offset: usize,
        context: &'static str,
    },

    /// Received a length marker byte this subset does not use
    #[error("unsupported BER length form {marker:#04x} at offset {offset}")]
    UnsupportedLengthForm { marker: u8, offset: usize },

    /// A structurally required tag was missing or mismatched
    #[error("unexpected tag {got:#04x} at offset {offset}: expected {expected:#04x}")]
    UnexpectedTag {
        expected: u8,
        got: u8,
        offset: usize,
    },

    /// Declared field width disagrees with the fixed width the protocol uses
    #[error("field width mismatch at offset {offset}: {context} is {got} bytes, expected {expected}")]
    FieldWidthMismatch {
        expected: usize,
        got: usize,
        offset: usize,
        context: &'static str,
    },

    /// Template patch addressed an ASDU or channel the template was not built with
    #[error("template field out of range: {context} index {index}, template has {len}")]
    FieldOutOfRange {
        context: &'static str,
        index: usize,
        len: usize,
    },

    /// Stream configuration cannot produce a frame (no ASDUs, no channels)
    #[error("invalid stream configuration: {reason}")]
    InvalidStream { reason: &'static str },

    /// Construction-time type validation failed
    #[error(transparent)]
    Types(#[from] TypesError),
}

impl CodecError {
    pub fn truncated(need: usize, got: usize, offset: usize, context: &'static str) -> Self {
        Self::Truncated {
            need,
            got,
            offset,
            context,
        }
    }
}
