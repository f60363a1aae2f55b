//! nxtctl - NXT throttle quadrant bridge
//!
//! Connects to a LEGO NXT brick over a serial port, walks the user through
//! calibrating the throttle, pitch and yaw levers, then streams their
//! positions as percentages.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;
mod serial;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::ConnectionArgs;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "nxtctl")]
#[command(about = "Calibrate and stream an NXT-based throttle quadrant")]
#[command(version)]
#[command(long_about = "
nxtctl talks to a LEGO NXT brick whose three motors act as throttle, pitch
and yaw levers. It zeroes each motor at its backward stop, learns the
direction and travel of each lever from its forward stop, and then reports
lever positions as percentages.

Use --json for machine-readable output suitable for piping into a
simulator bridge.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Serial port the brick is paired on
    #[arg(long, global = true, env = "NXTCTL_PORT", default_value = serial::DEFAULT_PORT)]
    port: String,

    /// Serial baud rate
    #[arg(long, global = true, default_value_t = serial::DEFAULT_BAUD)]
    baud: u32,

    /// Session configuration file (JSON)
    #[arg(long, global = true, env = "NXTCTL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate interactively, then stream axis percentages
    Run {
        /// Stop streaming after this many seconds instead of on Enter
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Print raw rotation counts without calibrating
    Probe,

    /// Play a tone on the brick
    Tone {
        /// Frequency in Hz
        #[arg(long, default_value_t = 1000)]
        frequency: u16,

        /// Duration in milliseconds
        #[arg(long, default_value_t = 200)]
        duration: u16,
    },

    /// Print the effective session configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "nxtctl={level},nxt_throttle_session={level},nxt_throttle_transport={level}",
                    level = log_level
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = execute_command(&cli);

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let exit_code = e
                .downcast_ref::<CliError>()
                .map_or(1, CliError::exit_code);
            std::process::exit(exit_code);
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    let args = ConnectionArgs {
        port: cli.port.clone(),
        baud: cli.baud,
        config: cli.config.clone(),
    };

    match &cli.command {
        Commands::Run { duration } => commands::run::execute(&args, *duration, cli.json),
        Commands::Probe => commands::probe::execute(&args, cli.json),
        Commands::Tone {
            frequency,
            duration,
        } => commands::tone::execute(&args, *frequency, *duration, cli.json),
        Commands::Config => commands::config::execute(&args),
    }
}
