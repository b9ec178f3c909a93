//! Construction-time errors for wire and data-model types.
//!
//! Every variant names the offending input so configuration mistakes are
//! diagnosable from the error alone, without a debugger.

use thiserror::Error;

/// Validation errors raised while constructing wire-level types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// MAC address text did not parse as six colon-separated hex octets
    #[error("invalid MAC address '{text}': {reason}")]
    InvalidMac { text: String, reason: String },

    /// 802.1Q priority code point outside 0..=7
    #[error("VLAN priority {value} out of range (0..=7)")]
    VlanPriorityOutOfRange { value: u8 },

    /// 802.1Q VLAN identifier outside 0..=4095
    #[error("VLAN id {value} out of range (0..=4095)")]
    VlanIdOutOfRange { value: u16 },

    /// EtherType value is not one this system publishes or decodes
    #[error("unsupported EtherType {value:#06x}: expected 0x88B8 (GOOSE) or 0x88BA (SV)")]
    UnsupportedEtherType { value: u16 },

    /// smpSynch byte is not a defined synchronization state
    #[error("unknown smpSynch value {value}: defined values are 0 (none), 1 (local), 2 (global)")]
    UnknownSmpSynch { value: u8 },

    /// Timestamp predates the Unix epoch and cannot be represented
    #[error("timestamp before Unix epoch cannot be encoded")]
    TimestampBeforeEpoch,
}

impl TypesError {
    pub fn invalid_mac(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMac {
            text: text.into(),
            reason: reason.into(),
        }
    }
}
