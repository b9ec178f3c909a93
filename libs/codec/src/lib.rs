//! # iedsim Protocol Codec
//!
//! ## Purpose
//!
//! Byte-exact BER-TLV encoding and decoding for IEC 61850 GOOSE and
//! Sampled-Value frames. The encoder produces, in a single pass, both the
//! wire bytes and an index of field byte-offsets; the publisher then
//! patches fixed-width fields (sample counter, channel samples, GOOSE
//! booleans, timestamps) in place without re-encoding or allocating. The
//! decoder walks received TLV structure defensively and never reads past a
//! buffer, however malformed the input.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [libs/codec] → services/emulator
//!     ↑             ↓               ↓
//! PDU Model    Buffer + Offset   Per-Tick Patch
//! Structures   Index             and Transmit
//! ```
//!
//! ## What This Crate Does NOT Contain
//!
//! - Socket or transport handling (libs/network)
//! - Replay scheduling and trip logic (services/emulator)
//! - A general ASN.1/BER library: only the tag subset IEC 61850 uses

pub mod ber;
pub mod decode;
pub mod error;
pub mod ethernet;
pub mod goose;
pub mod sv;

pub use ber::{decode_length, encode_length, encoded_length_size, BerReader, MAX_ENCODABLE_LEN};
pub use decode::{classify_frame, decode_goose, decode_sv, FrameView, GooseView, SvAsduView, SvView};
pub use error::{CodecError, CodecResult};
pub use ethernet::LinkHeader;
pub use goose::{encode_goose_frame, EntryOffset, GooseOffsets, GooseTemplate};
pub use sv::{encode_sv_frame, SvAsduOffsets, SvOffsets, SvTemplate};

/// Outer PDU tag for Sampled Values.
pub const TAG_SV_PDU: u8 = 0x60;
/// Outer PDU tag for GOOSE.
pub const TAG_GOOSE_PDU: u8 = 0x61;
