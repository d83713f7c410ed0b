//! aprskiss Tools library
//!
//! Everything around the codec: configuration, apogee detection, the KISS
//! TCP sink, PTT keying, the modem process and the beacon loop.

pub mod apogee;
pub mod beacon;
pub mod common;
pub mod config;
pub mod modem;
pub mod ptt;
pub mod transport;

pub use apogee::{detect_apogee, format_message, AltitudeSource, ApogeeDetector, LineAltitudeSource};
pub use beacon::Beacon;
pub use common::init_logging;
pub use config::BeaconConfig;
pub use modem::ModemProcess;
pub use ptt::{NoPtt, PttGuard, PttLine, SysfsGpio};
pub use transport::{PacketSink, TcpKissSink};
