//! Message to KISS packet assembly

use crate::ax25::FrameBuilder;
use crate::kiss;
use aprskiss_core::address::StationAddress;
use aprskiss_core::Result;
use tracing::debug;

/// Assembles text messages into transmittable KISS packets
///
/// Holds only the two station addresses and the TNC port, so one assembler
/// can be shared freely between callers.
#[derive(Debug, Clone, Copy)]
pub struct PacketAssembler {
    source: StationAddress,
    destination: StationAddress,
    port: u8,
}

impl PacketAssembler {
    pub fn new(source: StationAddress, destination: StationAddress) -> Self {
        Self {
            source,
            destination,
            port: 0,
        }
    }

    /// Set the KISS port
    pub fn port(mut self, port: u8) -> Self {
        self.port = port;
        self
    }

    pub fn source(&self) -> StationAddress {
        self.source
    }

    pub fn destination(&self) -> StationAddress {
        self.destination
    }

    /// Build the complete KISS byte stream for one message
    ///
    /// Either the whole packet is returned or an error; nothing is emitted
    /// for a message that fails validation.
    pub fn assemble(&self, message: &str) -> Result<Vec<u8>> {
        let frame = FrameBuilder::new(self.destination, self.source).build(message.as_bytes())?;
        let packet = kiss::encode_with_port(self.port, &frame);

        debug!(
            "Assembled packet {} > {}: {:?} ({} bytes)",
            self.source,
            self.destination,
            message,
            packet.len()
        );

        Ok(packet)
    }
}

/// Turn a message and two stations into KISS bytes
pub fn assemble(
    message: &str,
    source: &str,
    source_ssid: u8,
    destination: &str,
    destination_ssid: u8,
) -> Result<Vec<u8>> {
    let source = StationAddress::parse(source, source_ssid)?;
    let destination = StationAddress::parse(destination, destination_ssid)?;
    PacketAssembler::new(source, destination).assemble(message)
}
