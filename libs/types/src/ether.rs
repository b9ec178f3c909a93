//! EtherType values carried by IEC 61850 link-layer frames.

use crate::TypesError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// EtherType discriminating the two PDU families this system handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum EtherType {
    /// Generic Object Oriented Substation Event, IEC 61850-8-1
    Goose = 0x88B8,
    /// Sampled Values, IEC 61850-9-2
    SampledValues = 0x88BA,
}

impl EtherType {
    /// Classify a received EtherType, rejecting anything this system does
    /// not publish or decode.
    pub fn classify(value: u16) -> Result<Self, TypesError> {
        Self::try_from(value).map_err(|_| TypesError::UnsupportedEtherType { value })
    }
}
