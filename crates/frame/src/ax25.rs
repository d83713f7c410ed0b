//! AX.25 UI frame construction and parsing
//!
//! ```text
//! | Dest Addr (7) | Src Addr (7) | Control (1) | PID (1) | Info (N) |
//! ```
//!
//! Only unnumbered information frames with a two-address field are handled.
//! The FCS is left to the TNC.

use aprskiss_core::address::{decode_address, StationAddress, ADDRESS_LEN};
use aprskiss_core::{PacketError, Result};
use serde::Serialize;
use tracing::debug;

/// Control field for a UI frame, poll/final clear
pub const CONTROL_UI: u8 = 0x03;

/// PID for "no layer 3 protocol"
pub const PID_NO_LAYER3: u8 = 0xF0;

/// Size of the address field, control and PID bytes
pub const HEADER_LEN: usize = 2 * ADDRESS_LEN + 2;

/// Check that every payload byte is 7-bit ASCII
pub fn check_ascii(payload: &[u8]) -> Result<()> {
    match payload.iter().position(|b| !b.is_ascii()) {
        Some(position) => Err(PacketError::PayloadEncoding {
            position,
            byte: payload[position],
        }),
        None => Ok(()),
    }
}

/// Frame builder for UI frames between two stations
#[derive(Debug, Clone, Copy)]
pub struct FrameBuilder {
    destination: StationAddress,
    source: StationAddress,
    pid: u8,
}

impl FrameBuilder {
    /// Create a new frame builder
    pub fn new(destination: StationAddress, source: StationAddress) -> Self {
        Self {
            destination,
            source,
            pid: PID_NO_LAYER3,
        }
    }

    /// Set the protocol identifier
    pub fn pid(mut self, pid: u8) -> Self {
        self.pid = pid;
        self
    }

    /// Build the frame bytes
    ///
    /// The destination always comes first; the source is the final address
    /// and carries the extension bit since no repeater path is modelled.
    pub fn build(&self, payload: &[u8]) -> Result<Vec<u8>> {
        check_ascii(payload)?;

        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&self.destination.encode(false));
        frame.extend_from_slice(&self.source.encode(true));
        frame.push(CONTROL_UI);
        frame.push(self.pid);
        frame.extend_from_slice(payload);

        debug!(
            "Built UI frame {} > {}: {} bytes",
            self.source,
            self.destination,
            frame.len()
        );

        Ok(frame)
    }
}

/// Build a UI frame from raw callsign/SSID parts
pub fn build_ui_frame(
    dest: &str,
    dest_ssid: u8,
    src: &str,
    src_ssid: u8,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let destination = StationAddress::parse(dest, dest_ssid)?;
    let source = StationAddress::parse(src, src_ssid)?;
    FrameBuilder::new(destination, source).build(payload)
}

/// A parsed UI frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ax25Frame {
    pub destination: StationAddress,
    pub source: StationAddress,
    pub control: u8,
    pub pid: u8,
    pub info: Vec<u8>,
}

impl Ax25Frame {
    /// Parse a two-address UI frame
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(PacketError::MalformedFrame {
                msg: format!("Frame too short: {} bytes", bytes.len()),
            });
        }

        let (destination, dest_last) = parse_address(&bytes[..ADDRESS_LEN])?;
        if dest_last {
            return Err(PacketError::MalformedFrame {
                msg: "Destination marked as last address".to_string(),
            });
        }

        let (source, src_last) = parse_address(&bytes[ADDRESS_LEN..2 * ADDRESS_LEN])?;
        if !src_last {
            return Err(PacketError::MalformedFrame {
                msg: "Digipeater paths are not supported".to_string(),
            });
        }

        let control = bytes[2 * ADDRESS_LEN];
        if control != CONTROL_UI {
            return Err(PacketError::MalformedFrame {
                msg: format!("Not a UI frame: control 0x{:02X}", control),
            });
        }

        Ok(Self {
            destination,
            source,
            control,
            pid: bytes[2 * ADDRESS_LEN + 1],
            info: bytes[HEADER_LEN..].to_vec(),
        })
    }

    /// Info field as text, lossy for non-UTF-8 bytes
    pub fn info_text(&self) -> String {
        String::from_utf8_lossy(&self.info).into_owned()
    }

    /// Serialize back to frame bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        FrameBuilder::new(self.destination, self.source)
            .pid(self.pid)
            .build(&self.info)
    }
}

fn parse_address(bytes: &[u8]) -> Result<(StationAddress, bool)> {
    let field: &[u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| PacketError::MalformedFrame {
        msg: "Truncated address field".to_string(),
    })?;

    if field[..ADDRESS_LEN - 1].iter().any(|b| b & 0x01 != 0) {
        return Err(PacketError::MalformedFrame {
            msg: "Address extension bit set inside callsign".to_string(),
        });
    }

    let decoded = decode_address(field);
    let address = StationAddress::parse(decoded.trimmed(), decoded.ssid)?;
    Ok((address, decoded.is_last))
}
