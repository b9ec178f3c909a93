//! GOOSE protocol data unit model.
//!
//! A `GoosePdu` is the typed description the codec turns into one BER-TLV
//! byte sequence. Dataset entries are `GooseValue`s, each carrying the
//! fixed context tag byte the encoding uses; the tag set follows the MMS
//! `Data` choice as profiled by IEC 61850-8-1.

use crate::UtcTimestamp;

/// One typed entry of a GOOSE dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum GooseValue {
    Boolean(bool),
    /// Packed bit string: unused-bit count, then bits MSB-first.
    BitString {
        padding: u8,
        bits: Vec<u8>,
    },
    /// Signed integer, encoded minimal-length two's complement.
    Integer(i64),
    /// Unsigned integer, encoded minimal-length with a leading zero octet
    /// when the high bit would otherwise read as a sign.
    Unsigned(u64),
    /// Floating point rendered as decimal text, as the source device family
    /// publishes it.
    FloatText(String),
    /// IEEE-754 double, 8 bytes big-endian.
    Double(f64),
    OctetString(Vec<u8>),
    VisibleString(String),
    /// Binary-coded decimal, packed two digits per octet.
    Bcd(u64),
    /// Boolean array, packed like a bit string.
    BooleanArray(Vec<bool>),
    /// Object identifier arcs, BER base-128 content encoding.
    ObjectId(Vec<u32>),
    MmsString(String),
    UtcTime(UtcTimestamp),
}

impl GooseValue {
    /// The fixed context tag byte for this variant.
    pub fn tag(&self) -> u8 {
        match self {
            GooseValue::Boolean(_) => 0x83,
            GooseValue::BitString { .. } => 0x84,
            GooseValue::Integer(_) => 0x85,
            GooseValue::Unsigned(_) => 0x86,
            GooseValue::FloatText(_) => 0x87,
            GooseValue::Double(_) => 0x88,
            GooseValue::OctetString(_) => 0x89,
            GooseValue::VisibleString(_) => 0x8A,
            GooseValue::Bcd(_) => 0x8D,
            GooseValue::BooleanArray(_) => 0x8E,
            GooseValue::ObjectId(_) => 0x8F,
            GooseValue::MmsString(_) => 0x90,
            GooseValue::UtcTime(_) => 0x91,
        }
    }
}

/// Boolean dataset-entry tag, the one the sniffer extracts positionally.
pub const TAG_DATA_BOOLEAN: u8 = 0x83;

/// A complete GOOSE PDU as published by one control block.
#[derive(Debug, Clone, PartialEq)]
pub struct GoosePdu {
    /// Control block reference, e.g. `"IED1LD0/LLN0$GO$gcb01"`.
    pub gocb_ref: String,
    /// Time allowed to live in milliseconds before subscribers declare the
    /// publisher lost.
    pub time_allowed_to_live: u32,
    /// Dataset reference, e.g. `"IED1LD0/LLN0$Dataset1"`.
    pub dataset_ref: String,
    /// GOOSE id; omitted from the encoding when `None`.
    pub go_id: Option<String>,
    /// Event timestamp.
    pub timestamp: UtcTimestamp,
    /// State number. Static here: change-detection retransmission is out of
    /// scope for this emulator.
    pub st_num: u32,
    /// Sequence number, same caveat as `st_num`.
    pub sq_num: u32,
    pub simulation: bool,
    pub conf_rev: u32,
    /// Needs-commissioning flag.
    pub nds_com: bool,
    /// Ordered dataset entries. `num_dat_set_entries` on the wire is this
    /// vector's length.
    pub entries: Vec<GooseValue>,
}

impl GoosePdu {
    pub fn num_entries(&self) -> u32 {
        self.entries.len() as u32
    }
}
