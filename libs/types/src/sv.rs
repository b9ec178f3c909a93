//! Sampled Values stream model.
//!
//! Describes the static shape of an SV stream: how many ASDUs per frame and
//! what each ASDU carries. The codec turns this into a packet template once
//! per stream start; per-tick publishing only patches the sample counter
//! and channel values inside that template.

use crate::{TypesError, UtcTimestamp};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Synchronization state advertised in the ASDU `smpSynch` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SmpSynch {
    None = 0,
    Local = 1,
    Global = 2,
}

impl Default for SmpSynch {
    fn default() -> Self {
        SmpSynch::None
    }
}

impl SmpSynch {
    pub fn from_wire(value: u8) -> Result<Self, TypesError> {
        Self::try_from(value).map_err(|_| TypesError::UnknownSmpSynch { value })
    }
}

/// Static description of one ASDU within an SV frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SvAsdu {
    /// SV stream id, e.g. `"MU01"`.
    pub sv_id: String,
    /// Dataset reference; omitted from the encoding when `None`.
    pub dataset_ref: Option<String>,
    /// Initial sample count. Wraps at the configured rate, 16 bits at most.
    pub smp_cnt: u16,
    pub conf_rev: u32,
    /// Refresh time; omitted when `None`.
    pub refresh_time: Option<UtcTimestamp>,
    pub smp_synch: SmpSynch,
    /// Advertised sample rate; omitted when `None`.
    pub smp_rate: Option<u16>,
    /// Number of analog channels. The sample block is 8 bytes per channel:
    /// 4-byte value plus 4-byte quality.
    pub channel_count: usize,
    /// Sample mode; omitted when `None`.
    pub smp_mod: Option<u16>,
}

/// Static description of a complete SV frame: one or more ASDUs plus an
/// optional security blob.
#[derive(Debug, Clone, PartialEq)]
pub struct SvStreamConfig {
    pub security: Option<Vec<u8>>,
    pub asdus: Vec<SvAsdu>,
}

impl SvStreamConfig {
    /// Single-ASDU stream, the common merging-unit shape.
    pub fn single(asdu: SvAsdu) -> Self {
        Self {
            security: None,
            asdus: vec![asdu],
        }
    }

    pub fn num_asdus(&self) -> usize {
        self.asdus.len()
    }
}

/// Bytes per channel inside the sample block: 4-byte value + 4-byte quality.
pub const SAMPLE_ENTRY_SIZE: usize = 8;
