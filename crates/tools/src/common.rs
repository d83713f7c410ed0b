//! Common utilities for tools

use anyhow::Result;
use tracing::Level;

/// Pick the log level from the command line flags and configuration
///
/// `--debug` wins over `--verbose`, and either wins over the configured
/// level. With none of them only warnings are shown.
pub fn select_level(debug: bool, verbose: bool, configured: Option<Level>) -> Level {
    if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        configured.unwrap_or(Level::WARN)
    }
}

/// Initialize logging
pub fn init_logging(debug: bool, verbose: bool, configured: Option<Level>) {
    let log_level = select_level(debug, verbose, configured);

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse a level name such as `info` or `DEBUG`
pub fn parse_level(name: &str) -> Result<Level> {
    name.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown log level {:?}", name))
}

/// Format bytes as space separated upper-case hex
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex, ignoring whitespace and an optional `0x` on each byte
pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .split_whitespace()
        .map(|tok| tok.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();

    if !digits.is_ascii() {
        anyhow::bail!("Hex input contains non-ASCII characters");
    }

    if digits.len() % 2 != 0 {
        anyhow::bail!("Odd number of hex digits: {}", digits.len());
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| anyhow::anyhow!("Invalid hex {:?}: {}", &digits[i..i + 2], e))
        })
        .collect()
}
