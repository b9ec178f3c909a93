//! Ethernet and 802.1Q link-layer framing.
//!
//! Frame layout ahead of the BER-TLV PDU:
//!
//! ```text
//! dst MAC (6) | src MAC (6) | [TPID 0x8100 (2) | TCI (2)] | EtherType (2)
//! | APPID (2) | Length (2) | Reserved1 (2) | Reserved2 (2) | PDU ...
//! ```
//!
//! The Length field counts from APPID through the end of the PDU, so it is
//! always `8 + pdu_len`.

use crate::{CodecError, CodecResult};
use types::vlan::TPID;
use types::{EtherType, MacAddr, VlanTag};

/// Bytes from APPID through Reserved2, the fixed preamble the Length field
/// adds on top of the PDU length.
pub const APDU_HEADER_SIZE: usize = 8;

/// Link-layer parameters of a published stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub vlan: Option<VlanTag>,
    pub ethertype: EtherType,
    pub app_id: u16,
}

impl LinkHeader {
    /// Size of the encoded header, VLAN tag included when present.
    pub fn encoded_size(&self) -> usize {
        12 + if self.vlan.is_some() { 4 } else { 0 } + 2 + APDU_HEADER_SIZE
    }

    /// Append the header for a frame whose PDU is `pdu_len` bytes long.
    pub fn encode_into(&self, pdu_len: usize, out: &mut Vec<u8>) -> CodecResult<()> {
        let apdu_len = APDU_HEADER_SIZE + pdu_len;
        if apdu_len > u16::MAX as usize {
            return Err(CodecError::LengthOverflow { len: pdu_len });
        }

        out.extend_from_slice(&self.dst.octets());
        out.extend_from_slice(&self.src.octets());
        if let Some(vlan) = &self.vlan {
            out.extend_from_slice(&TPID.to_be_bytes());
            out.extend_from_slice(&vlan.tci().to_be_bytes());
        }
        out.extend_from_slice(&u16::from(self.ethertype).to_be_bytes());
        out.extend_from_slice(&self.app_id.to_be_bytes());
        out.extend_from_slice(&(apdu_len as u16).to_be_bytes());
        out.extend_from_slice(&[0u8; 4]); // reserved1, reserved2
        Ok(())
    }
}
