//! aprskiss Frame - AX.25 UI framing and KISS encapsulation
//!
//! This crate turns a text message and two station addresses into the byte
//! stream a KISS TNC expects: an AX.25 UI frame, escaped and wrapped in KISS
//! delimiters.

pub mod ax25;
pub mod kiss;
pub mod packet;

pub use aprskiss_core::{PacketError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        ax25::{build_ui_frame, Ax25Frame, FrameBuilder, CONTROL_UI, PID_NO_LAYER3},
        kiss::{KissDecoder, KissFrame},
        packet::{assemble, PacketAssembler},
    };
    pub use aprskiss_core::prelude::*;
}
