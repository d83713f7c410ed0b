//! Configuration management for aprskiss tools

use anyhow::{Context, Result};
use aprskiss_core::address::StationAddress;
use clap::parser::ValueSource;
use clap::{ArgMatches, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

use crate::common::parse_level;

/// Placeholder replaced by the apogee value in message templates
pub const APOGEE_PLACEHOLDER: &str = "{apogee}";

/// Beacon configuration
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[serde(default)]
pub struct BeaconConfig {
    /// Source station, CALL or CALL-SSID
    #[arg(short, long, default_value = "KQ4FYU-1")]
    pub source: StationAddress,

    /// Destination station, CALL or CALL-SSID
    #[arg(short, long, default_value = "APRS")]
    pub destination: StationAddress,

    /// KISS TCP host of the modem
    #[arg(long, default_value = "127.0.0.1")]
    pub kiss_host: String,

    /// KISS TCP port of the modem
    #[arg(long, default_value = "8001")]
    pub kiss_port: u16,

    /// TNC port number carried in the KISS command byte
    #[arg(long, default_value = "0")]
    pub tnc_port: u8,

    /// Number of times each packet is sent
    #[arg(short, long, default_value = "10")]
    pub repeat: u32,

    /// Seconds to hold PTT after each send
    #[arg(long, default_value = "15")]
    pub hold_secs: u64,

    /// Seconds to wait for the TCP connection
    #[arg(long, default_value = "5")]
    pub connect_timeout_secs: u64,

    /// GPIO pin keyed around each transmission
    #[arg(long)]
    pub ptt_pin: Option<u32>,

    /// sysfs GPIO root
    #[arg(long, default_value = "/sys/class/gpio")]
    pub gpio_root: PathBuf,

    /// Modem executable to spawn before transmitting
    #[arg(long)]
    pub modem_command: Option<PathBuf>,

    /// Arguments passed to the modem executable
    #[arg(long = "modem-arg", allow_hyphen_values = true)]
    pub modem_args: Vec<String>,

    /// Message template, `{apogee}` is replaced by the detected value
    #[arg(short, long, default_value = "!Highest apogee = {apogee}")]
    pub message: String,

    /// Log level used without --verbose/--debug (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            source: StationAddress::parse("KQ4FYU", 1).expect("valid default source"),
            destination: StationAddress::parse("APRS", 0).expect("valid default destination"),
            kiss_host: "127.0.0.1".to_string(),
            kiss_port: 8001,
            tnc_port: 0,
            repeat: 10,
            hold_secs: 15,
            connect_timeout_secs: 5,
            ptt_pin: None,
            gpio_root: PathBuf::from("/sys/class/gpio"),
            modem_command: None,
            modem_args: Vec::new(),
            message: format!("!Highest apogee = {}", APOGEE_PLACEHOLDER),
            log_level: None,
        }
    }
}

impl BeaconConfig {
    /// Load configuration from a TOML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, then apply the flags given on the command line
    ///
    /// `matches` must come from the command `flags` was parsed from. Only
    /// flags the user actually passed replace file values; clap defaults do
    /// not.
    pub fn load_with_overrides(path: &Path, flags: Self, matches: &ArgMatches) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_cli_overrides(flags, matches);
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).context("Failed to parse JSON config file")
        } else {
            toml::from_str(&content).context("Failed to parse TOML config file")
        }
    }

    /// Copy every field set explicitly on the command line from `flags`
    pub fn apply_cli_overrides(&mut self, flags: Self, matches: &ArgMatches) {
        let explicit = |id: &str| matches.value_source(id) == Some(ValueSource::CommandLine);

        macro_rules! take_explicit {
            ($($field:ident),* $(,)?) => {
                $(
                    if explicit(stringify!($field)) {
                        self.$field = flags.$field;
                    }
                )*
            };
        }

        take_explicit!(
            source,
            destination,
            kiss_host,
            kiss_port,
            tnc_port,
            repeat,
            hold_secs,
            connect_timeout_secs,
            ptt_pin,
            gpio_root,
            modem_command,
            modem_args,
            message,
            log_level,
        );
    }

    /// Save configuration to a TOML or JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        } else {
            toml::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Check settings the types alone do not enforce
    pub fn validate(&self) -> Result<()> {
        if self.tnc_port > 0x0F {
            anyhow::bail!("TNC port must be 0-15, got {}", self.tnc_port);
        }
        if self.kiss_host.is_empty() {
            anyhow::bail!("KISS host must not be empty");
        }
        self.log_level()?;
        Ok(())
    }

    /// Parsed `log_level`, if one is configured
    pub fn log_level(&self) -> Result<Option<Level>> {
        self.log_level.as_deref().map(parse_level).transpose()
    }

    /// `host:port` of the KISS endpoint
    pub fn kiss_addr(&self) -> String {
        format!("{}:{}", self.kiss_host, self.kiss_port)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_secs(self.hold_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
