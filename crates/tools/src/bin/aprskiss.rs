//! aprskiss - APRS UI packets over KISS
//!
//! Main entry point for encoding, sending and inspecting packets, and for the
//! apogee beacon flow.

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use aprskiss_core::address::StationAddress;
use aprskiss_frame::prelude::*;
use aprskiss_tools::common::{from_hex, to_hex};
use aprskiss_tools::{
    detect_apogee, format_message, init_logging, AltitudeSource, Beacon, BeaconConfig,
    LineAltitudeSource, ModemProcess,
};

/// aprskiss packet tool
#[derive(Parser)]
#[command(name = "aprskiss")]
#[command(about = "AX.25 UI packets over KISS for APRS beacons")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the KISS bytes for a message as hex
    Encode(EncodeArgs),
    /// Send a message to the modem's KISS TCP port
    Send(SendArgs),
    /// Decode a hex KISS frame and show its AX.25 fields
    Inspect(InspectArgs),
    /// Wait for apogee, then beacon it
    Beacon(BeaconArgs),
}

#[derive(Args)]
struct EncodeArgs {
    /// Message text (7-bit ASCII)
    message: String,

    /// Source station, CALL or CALL-SSID
    #[arg(short, long, default_value = "KQ4FYU-1")]
    source: StationAddress,

    /// Destination station, CALL or CALL-SSID
    #[arg(short, long, default_value = "APRS")]
    destination: StationAddress,

    /// TNC port number
    #[arg(long, default_value = "0")]
    tnc_port: u8,
}

#[derive(Args)]
struct SendArgs {
    /// Load settings from a TOML or JSON file; flags given override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fill `{apogee}` in the message with this value
    #[arg(long)]
    apogee: Option<f64>,

    #[command(flatten)]
    beacon: BeaconConfig,
}

#[derive(Args)]
struct InspectArgs {
    /// KISS frame as hex, e.g. "C0 00 82 A0 ..."
    hex: String,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct BeaconArgs {
    /// Load settings from a TOML or JSON file; flags given override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Altitude samples, one per line (stdin if omitted)
    #[arg(long)]
    altitudes: Option<PathBuf>,

    #[command(flatten)]
    beacon: BeaconConfig,
}

/// Settings from `--config` (if any) with explicit flags applied on top
fn resolve_config(
    path: Option<&Path>,
    flags: BeaconConfig,
    matches: &ArgMatches,
) -> Result<BeaconConfig> {
    match path {
        Some(path) => BeaconConfig::load_with_overrides(path, flags, matches),
        None => {
            flags.validate()?;
            Ok(flags)
        }
    }
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let packet = PacketAssembler::new(args.source, args.destination)
        .port(args.tnc_port)
        .assemble(&args.message)?;
    println!("{}", to_hex(&packet));
    Ok(())
}

fn run_send(config: BeaconConfig, apogee: Option<f64>) -> Result<()> {
    let message = match apogee {
        Some(apogee) => format_message(&config.message, apogee),
        None => config.message.clone(),
    };

    let mut beacon = Beacon::from_config(&config)?;
    let sent = beacon.transmit(&message)?;
    println!("Sent {} packet(s) to {}", sent, config.kiss_addr());
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let bytes = from_hex(&args.hex)?;
    let kiss = KissFrame::parse(&bytes)?;
    let frame = Ax25Frame::parse(&kiss.data)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&frame)?);
        return Ok(());
    }

    println!("KISS port:   {}", kiss.port);
    println!("KISS cmd:    0x{:02X}", kiss.command);
    println!("Destination: {}", frame.destination);
    println!("Source:      {}", frame.source);
    println!("Control:     0x{:02X}", frame.control);
    println!("PID:         0x{:02X}", frame.pid);
    println!("Info:        {}", frame.info_text());
    Ok(())
}

fn run_beacon(config: BeaconConfig, altitudes: Option<PathBuf>) -> Result<()> {
    let modem = match &config.modem_command {
        Some(program) => Some(ModemProcess::spawn(program, &config.modem_args)?),
        None => None,
    };

    let mut source: Box<dyn AltitudeSource> = match &altitudes {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open altitude file {:?}", path))?;
            Box::new(LineAltitudeSource::new(BufReader::new(file)))
        }
        None => Box::new(LineAltitudeSource::new(io::stdin().lock())),
    };

    let result = detect_apogee(source.as_mut()).and_then(|apogee| match apogee {
        Some(apogee) => {
            let message = format_message(&config.message, apogee);
            info!("Beaconing {:?}", message);
            Beacon::from_config(&config)?.transmit(&message)
        }
        None => anyhow::bail!("Altitude samples ended before apogee"),
    });

    if let Some(modem) = modem {
        if result.is_err() {
            warn!("Beacon failed, stopping modem");
            modem.terminate()?;
        } else {
            info!("Waiting for modem pid {} to exit", modem.id());
            modem.wait()?;
        }
    }

    let sent = result?;
    println!("Beacon complete: {} packet(s) sent", sent);
    Ok(())
}

fn main() -> Result<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let sub_matches = matches
        .subcommand()
        .map(|(_, sub)| sub)
        .context("No subcommand given")?;

    match cli.command {
        Commands::Encode(args) => {
            init_logging(cli.debug, cli.verbose, None);
            run_encode(args)
        }
        Commands::Send(args) => {
            let config = resolve_config(args.config.as_deref(), args.beacon, sub_matches)?;
            init_logging(cli.debug, cli.verbose, config.log_level()?);
            run_send(config, args.apogee)
        }
        Commands::Inspect(args) => {
            init_logging(cli.debug, cli.verbose, None);
            run_inspect(args)
        }
        Commands::Beacon(args) => {
            let config = resolve_config(args.config.as_deref(), args.beacon, sub_matches)?;
            init_logging(cli.debug, cli.verbose, config.log_level()?);
            run_beacon(config, args.altitudes)
        }
    }
}
