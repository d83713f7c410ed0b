//! KISS framing between host and TNC
//!
//! ```text
//! | FEND | command | escaped data ... | FEND |
//! ```
//!
//! The command byte carries the TNC port in its high nibble and the command
//! in its low nibble. Inside the data, FEND becomes `FESC TFEND` and FESC
//! becomes `FESC TFESC`.

use aprskiss_core::{PacketError, Result};
use tracing::{debug, warn};

/// Frame end
pub const FEND: u8 = 0xC0;
/// Frame escape
pub const FESC: u8 = 0xDB;
/// Transposed frame end
pub const TFEND: u8 = 0xDC;
/// Transposed frame escape
pub const TFESC: u8 = 0xDD;
/// Data frame command
pub const CMD_DATA: u8 = 0x00;

const MAX_PORT: u8 = 0x0F;

/// Escape FEND and FESC bytes into `out`
fn escape_into(data: &[u8], out: &mut Vec<u8>) {
    for &byte in data {
        match byte {
            FEND => out.extend_from_slice(&[FESC, TFEND]),
            FESC => out.extend_from_slice(&[FESC, TFESC]),
            other => out.push(other),
        }
    }
}

/// Wrap a frame as a KISS data frame on the given TNC port
pub fn encode_with_port(port: u8, frame: &[u8]) -> Vec<u8> {
    // Worst case every byte is escaped
    let mut out = Vec::with_capacity(frame.len() * 2 + 3);
    out.push(FEND);
    out.push(((port & MAX_PORT) << 4) | CMD_DATA);
    escape_into(frame, &mut out);
    out.push(FEND);

    debug!("KISS encoded {} bytes into {} bytes", frame.len(), out.len());
    out
}

/// Wrap a frame as a KISS data frame on port 0
pub fn encode(frame: &[u8]) -> Vec<u8> {
    encode_with_port(0, frame)
}

/// Unescape the data region of a single frame
fn unescape(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.iter();

    while let Some(&byte) = bytes.next() {
        match byte {
            FESC => match bytes.next() {
                Some(&TFEND) => out.push(FEND),
                Some(&TFESC) => out.push(FESC),
                Some(&other) => {
                    return Err(PacketError::KissDecode {
                        msg: format!("Invalid escape sequence FESC 0x{:02X}", other),
                    })
                }
                None => {
                    return Err(PacketError::KissDecode {
                        msg: "Dangling FESC at end of frame".to_string(),
                    })
                }
            },
            FEND => {
                return Err(PacketError::KissDecode {
                    msg: "Unexpected FEND inside frame".to_string(),
                })
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// A decoded KISS frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KissFrame {
    pub port: u8,
    pub command: u8,
    pub data: Vec<u8>,
}

impl KissFrame {
    /// Parse one complete `FEND ... FEND` frame
    pub fn parse(kiss: &[u8]) -> Result<Self> {
        if kiss.len() < 3 || kiss[0] != FEND || kiss[kiss.len() - 1] != FEND {
            return Err(PacketError::KissDecode {
                msg: "Frame must start and end with FEND".to_string(),
            });
        }

        let type_byte = kiss[1];
        let data = unescape(&kiss[2..kiss.len() - 1])?;

        Ok(Self {
            port: type_byte >> 4,
            command: type_byte & 0x0F,
            data,
        })
    }
}

/// Inverse of [`encode`]: recover the original frame bytes
pub fn decode(kiss: &[u8]) -> Result<Vec<u8>> {
    let frame = KissFrame::parse(kiss)?;
    if frame.command != CMD_DATA {
        return Err(PacketError::KissDecode {
            msg: format!("Not a data frame: command 0x{:02X}", frame.command),
        });
    }
    Ok(frame.data)
}

/// Default cap on a buffered frame body, escapes included
///
/// An AX.25 UI frame with a 256 byte info field fits even with every byte
/// escaped.
pub const MAX_FRAME_LEN: usize = 1024;

/// Incremental decoder for a KISS byte stream
///
/// Bytes may arrive in arbitrary chunks; completed data frames are returned
/// as they close. Empty frames between back-to-back FENDs are skipped. A
/// frame body that outgrows the length cap is discarded and the decoder
/// waits for the next FEND.
#[derive(Debug)]
pub struct KissDecoder {
    buffer: Vec<u8>,
    in_frame: bool,
    max_len: usize,
}

impl Default for KissDecoder {
    fn default() -> Self {
        Self {
            buffer: Vec::new(),
            in_frame: false,
            max_len: MAX_FRAME_LEN,
        }
    }
}

impl KissDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest frame body kept before it is dropped
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Bytes currently held for an unfinished frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed bytes and collect any frames they complete
    pub fn push(&mut self, bytes: &[u8]) -> Vec<KissFrame> {
        let mut frames = Vec::new();

        for &byte in bytes {
            if byte != FEND {
                if self.in_frame {
                    if self.buffer.len() >= self.max_len {
                        warn!(
                            "Dropping KISS frame longer than {} bytes, waiting for FEND",
                            self.max_len
                        );
                        self.reset();
                        continue;
                    }
                    self.buffer.push(byte);
                }
                continue;
            }

            if self.in_frame && !self.buffer.is_empty() {
                match Self::finish(&self.buffer) {
                    Ok(frame) => frames.push(frame),
                    Err(e) => warn!("Dropping KISS frame: {}", e),
                }
            }
            self.buffer.clear();
            self.in_frame = true;
        }

        frames
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        self.buffer = Vec::new();
        self.in_frame = false;
    }

    fn finish(body: &[u8]) -> Result<KissFrame> {
        let (&type_byte, escaped) = body.split_first().ok_or_else(|| PacketError::KissDecode {
            msg: "Empty frame".to_string(),
        })?;

        Ok(KissFrame {
            port: type_byte >> 4,
            command: type_byte & 0x0F,
            data: unescape(escaped)?,
        })
    }
}
