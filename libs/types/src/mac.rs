//! IEEE 802 MAC addresses with strict textual parsing.
//!
//! GOOSE and SV destination addresses come out of configuration files as
//! colon-hex text. Parsing rejects malformed input outright: an address is
//! never silently truncated or zero-padded, because a typo'd multicast
//! address would otherwise publish to the wrong group without any symptom
//! on the sending side.

use crate::TypesError;
use std::fmt;
use std::str::FromStr;

/// A 6-byte IEEE 802 MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// Construct from raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// The six raw octets, transmission order.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// True when the group bit (I/G) is set. GOOSE/SV destination
    /// addresses are multicast; source addresses must not be.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl FromStr for MacAddr {
    type Err = TypesError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut count = 0;

        for group in text.split(':') {
            if count == 6 {
                return Err(TypesError::invalid_mac(text, "more than 6 octets"));
            }
            if group.len() != 2 {
                return Err(TypesError::invalid_mac(
                    text,
                    format!("octet '{group}' is not exactly 2 hex digits"),
                ));
            }
            octets[count] = u8::from_str_radix(group, 16).map_err(|_| {
                TypesError::invalid_mac(text, format!("octet '{group}' is not hexadecimal"))
            })?;
            count += 1;
        }

        if count != 6 {
            return Err(TypesError::invalid_mac(
                text,
                format!("expected 6 octets, found {count}"),
            ));
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}
