//! aprskiss Core - AX.25 station addressing
//!
//! This crate provides the callsign and SSID types, the bit-shifted AX.25
//! address field encoding and the error taxonomy shared by every aprskiss
//! crate.

pub mod address;
pub mod error;

pub use error::{PacketError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        address::{
            decode_address, encode_address, Callsign, DecodedAddress, Ssid, StationAddress,
            ADDRESS_LEN, CALLSIGN_LEN,
        },
        error::{PacketError, Result},
    };
}
