//! Error types for aprskiss

use thiserror::Error;

/// Packet construction error types
///
/// The taxonomy is flat: every variant is a precondition violation surfaced
/// to the caller, and higher layers pass it through unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Invalid callsign {callsign:?}: {reason}")]
    InvalidCallsign { callsign: String, reason: String },

    #[error("Invalid SSID: {ssid} (must be 0-15)")]
    InvalidSsid { ssid: u32 },

    #[error("Payload is not 7-bit ASCII: byte 0x{byte:02X} at offset {position}")]
    PayloadEncoding { position: usize, byte: u8 },

    #[error("Malformed AX.25 frame: {msg}")]
    MalformedFrame { msg: String },

    #[error("KISS decode failed: {msg}")]
    KissDecode { msg: String },
}

/// Result type for aprskiss operations
pub type Result<T> = std::result::Result<T, PacketError>;
