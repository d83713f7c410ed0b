//! AX.25 address field encoding
//!
//! An address field is seven bytes: six callsign characters, each shifted
//! left by one bit, followed by the SSID byte
//!
//! ```text
//! bit  7   6   5   4   3   2   1   0
//!      C   R   R   S   S   S   S   E
//! ```
//!
//! where `SSSS` is the SSID, `RR` are the reserved bits (always `11`), and
//! `E` marks the last address in the field. `C` is left clear.

use crate::{PacketError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of callsign characters in an address field
pub const CALLSIGN_LEN: usize = 6;

/// Total size of an encoded address field in bytes
pub const ADDRESS_LEN: usize = CALLSIGN_LEN + 1;

/// Reserved bits of the SSID byte
const RESERVED_BITS: u8 = 0x60;

/// Address extension bit, set on the final address of the field
const LAST_ADDRESS_BIT: u8 = 0x01;

const SSID_MASK: u8 = 0x0F;

/// Station callsign, stored space-padded to six ASCII characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Callsign {
    padded: [u8; CALLSIGN_LEN],
    len: usize,
}

impl Callsign {
    /// Validate and pad a callsign
    ///
    /// Anything up to six ASCII characters is accepted, including the empty
    /// string (which encodes as six spaces). Case is preserved.
    pub fn new(callsign: &str) -> Result<Self> {
        if !callsign.is_ascii() {
            return Err(PacketError::InvalidCallsign {
                callsign: callsign.to_string(),
                reason: "contains non-ASCII characters".to_string(),
            });
        }

        if callsign.len() > CALLSIGN_LEN {
            return Err(PacketError::InvalidCallsign {
                callsign: callsign.to_string(),
                reason: format!("longer than {} characters", CALLSIGN_LEN),
            });
        }

        // Trailing spaces are padding, so "APRS" and "APRS  " are one callsign
        let callsign = callsign.trim_end_matches(' ');
        let mut padded = [b' '; CALLSIGN_LEN];
        padded[..callsign.len()].copy_from_slice(callsign.as_bytes());

        Ok(Self {
            padded,
            len: callsign.len(),
        })
    }

    /// The callsign without trailing padding
    pub fn as_str(&self) -> &str {
        // Only ASCII ever gets in through `new`
        std::str::from_utf8(&self.padded[..self.len]).unwrap_or_default()
    }

    /// The six padded characters that go on the wire
    pub fn padded(&self) -> &[u8; CALLSIGN_LEN] {
        &self.padded
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Callsign {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Callsign {
    type Error = PacketError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Callsign> for String {
    fn from(value: Callsign) -> Self {
        value.as_str().to_string()
    }
}

/// Secondary Station Identifier, 0 through 15
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u8")]
pub struct Ssid(u8);

impl Ssid {
    pub const MAX: u8 = 15;

    pub fn new(ssid: u8) -> Result<Self> {
        if ssid > Self::MAX {
            return Err(PacketError::InvalidSsid { ssid: ssid as u32 });
        }
        Ok(Self(ssid))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u32> for Ssid {
    type Error = PacketError;

    fn try_from(value: u32) -> Result<Self> {
        u8::try_from(value)
            .map_err(|_| PacketError::InvalidSsid { ssid: value })
            .and_then(Self::new)
    }
}

impl From<Ssid> for u8 {
    fn from(value: Ssid) -> Self {
        value.0
    }
}

impl fmt::Display for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encode one AX.25 address field
///
/// Fails with [`PacketError::InvalidCallsign`] for callsigns longer than six
/// characters or containing non-ASCII, and [`PacketError::InvalidSsid`] for
/// SSIDs above 15.
pub fn encode_address(callsign: &str, ssid: u8, is_last: bool) -> Result<[u8; ADDRESS_LEN]> {
    let callsign = Callsign::new(callsign)?;
    let ssid = Ssid::new(ssid)?;
    Ok(StationAddress::new(callsign, ssid).encode(is_last))
}

/// Callsign and SSID pair identifying one station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationAddress {
    pub callsign: Callsign,
    pub ssid: Ssid,
}

impl StationAddress {
    pub fn new(callsign: Callsign, ssid: Ssid) -> Self {
        Self { callsign, ssid }
    }

    /// Build from raw parts, validating both
    pub fn parse(callsign: &str, ssid: u8) -> Result<Self> {
        Ok(Self::new(Callsign::new(callsign)?, Ssid::new(ssid)?))
    }

    /// Encode to the seven-byte address field
    pub fn encode(&self, is_last: bool) -> [u8; ADDRESS_LEN] {
        let mut field = [0u8; ADDRESS_LEN];

        for (out, &ch) in field.iter_mut().zip(self.callsign.padded().iter()) {
            // ASCII is 7-bit, so the shift never overflows and bit 0 is left clear
            *out = ch << 1;
        }

        let mut ssid_byte = ((self.ssid.value() & SSID_MASK) << 1) | RESERVED_BITS;
        if is_last {
            ssid_byte |= LAST_ADDRESS_BIT;
        }
        field[CALLSIGN_LEN] = ssid_byte;

        field
    }
}

impl fmt::Display for StationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid.value() == 0 {
            write!(f, "{}", self.callsign)
        } else {
            write!(f, "{}-{}", self.callsign, self.ssid)
        }
    }
}

impl FromStr for StationAddress {
    type Err = PacketError;

    /// Parse `CALL` or `CALL-SSID`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.rsplit_once('-') {
            Some((call, ssid)) => {
                let ssid = ssid
                    .parse::<u32>()
                    .map_err(|_| PacketError::InvalidCallsign {
                        callsign: s.to_string(),
                        reason: format!("SSID suffix {:?} is not a number", ssid),
                    })?;
                Ok(Self::new(Callsign::new(call)?, Ssid::try_from(ssid)?))
            }
            None => Ok(Self::new(Callsign::new(s)?, Ssid::default())),
        }
    }
}

impl TryFrom<String> for StationAddress {
    type Error = PacketError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<StationAddress> for String {
    fn from(value: StationAddress) -> Self {
        value.to_string()
    }
}

/// Fields recovered from an encoded address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    /// Callsign including any space padding
    pub callsign: String,
    pub ssid: u8,
    pub is_last: bool,
}

impl DecodedAddress {
    /// Callsign with the trailing padding removed
    pub fn trimmed(&self) -> &str {
        self.callsign.trim_end_matches(' ')
    }
}

/// Inverse of [`encode_address`]
pub fn decode_address(field: &[u8; ADDRESS_LEN]) -> DecodedAddress {
    let callsign = field[..CALLSIGN_LEN]
        .iter()
        .map(|&b| (b >> 1) as char)
        .collect();
    let ssid_byte = field[CALLSIGN_LEN];

    DecodedAddress {
        callsign,
        ssid: (ssid_byte >> 1) & SSID_MASK,
        is_last: ssid_byte & LAST_ADDRESS_BIT != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_encode_aprs_destination() {
        let field = encode_address("APRS", 0, false).unwrap();
        assert_eq!(field, [0x82, 0xA0, 0xA4, 0xA6, 0x40, 0x40, 0x60]);
    }

    #[test]
    fn test_encode_source_sets_last_bit() {
        let field = encode_address("KQ4FYU", 1, true).unwrap();
        assert_eq!(field, [0x96, 0xA2, 0x68, 0x8C, 0xB2, 0xAA, 0x63]);
    }

    #[test]
    fn test_full_length_callsign_needs_no_padding() {
        let call = Callsign::new("N0CALL").unwrap();
        assert_eq!(call.padded(), b"N0CALL");
        assert_eq!(call.as_str(), "N0CALL");
    }

    #[test]
    fn test_empty_callsign_pads_to_spaces() {
        let field = encode_address("", 0, false).unwrap();
        assert_eq!(&field[..6], &[0x40; 6]);
        assert_eq!(decode_address(&field).callsign, "      ");
    }

    #[test]
    fn test_ssid_bounds() {
        for ssid in [0u8, 15] {
            let field = encode_address("W1AW", ssid, false).unwrap();
            assert_eq!(decode_address(&field).ssid, ssid);
        }
        assert_eq!(encode_address("W1AW", 15, true).unwrap()[6], 0x7F);
        assert_eq!(
            encode_address("W1AW", 16, false),
            Err(PacketError::InvalidSsid { ssid: 16 })
        );
    }

    #[test]
    fn test_rejects_long_callsign() {
        let err = encode_address("TOOLONG", 0, false).unwrap_err();
        assert!(matches!(err, PacketError::InvalidCallsign { .. }));
    }

    #[test]
    fn test_rejects_non_ascii_callsign() {
        let err = Callsign::new("S56ŠPZ").unwrap_err();
        assert!(matches!(err, PacketError::InvalidCallsign { .. }));
    }

    #[test]
    fn test_station_address_parse_and_display() {
        let addr: StationAddress = "KQ4FYU-1".parse().unwrap();
        assert_eq!(addr.callsign.as_str(), "KQ4FYU");
        assert_eq!(addr.ssid.value(), 1);
        assert_eq!(addr.to_string(), "KQ4FYU-1");

        let addr: StationAddress = "APRS".parse().unwrap();
        assert_eq!(addr.ssid.value(), 0);
        assert_eq!(addr.to_string(), "APRS");

        assert!(matches!(
            "W1AW-16".parse::<StationAddress>(),
            Err(PacketError::InvalidSsid { ssid: 16 })
        ));
        assert!("W1AW-X".parse::<StationAddress>().is_err());
    }

    #[test]
    fn test_trailing_padding_is_not_significant() {
        use std::collections::HashSet;

        let padded = Callsign::new("APRS  ").unwrap();
        assert_eq!(padded, Callsign::new("APRS").unwrap());
        assert_eq!(padded.as_str(), "APRS");
        assert_eq!(padded.padded(), b"APRS  ");

        let stations: HashSet<StationAddress> = ["APRS", "APRS  "]
            .iter()
            .map(|call| StationAddress::parse(call, 0).unwrap())
            .collect();
        assert_eq!(stations.len(), 1);

        // a decoded field compares equal to the station it was built from
        let field = encode_address("APRS  ", 0, false).unwrap();
        let decoded = decode_address(&field);
        assert_eq!(
            StationAddress::parse(decoded.trimmed(), decoded.ssid).unwrap(),
            StationAddress::parse("APRS", 0).unwrap()
        );

        // leading spaces are kept and still count towards the length
        assert_ne!(Callsign::new(" APRS").unwrap(), padded);
        assert!(Callsign::new("APRS   ").is_err());
    }

    #[test]
    fn test_encoded_callsign_bit0_clear() {
        let field = encode_address("ZZ9ZZZ", 7, true).unwrap();
        assert!(field[..6].iter().all(|b| b & 0x01 == 0));
    }

    #[quickcheck]
    fn prop_address_roundtrip(call: Vec<u8>, ssid: u8, last: bool) -> bool {
        let call: String = call
            .into_iter()
            .take(CALLSIGN_LEN)
            .map(|b| (b'A' + b % 26) as char)
            .collect();
        let ssid = ssid & 0x0F;

        let field = encode_address(&call, ssid, last).unwrap();
        let decoded = decode_address(&field);

        field.len() == ADDRESS_LEN
            && decoded.callsign == format!("{:<6}", call)
            && decoded.ssid == ssid
            && decoded.is_last == last
    }
}
