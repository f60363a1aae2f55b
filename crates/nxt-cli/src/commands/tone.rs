//! Tone command

use super::ConnectionArgs;
use crate::error::CliError;
use crate::output;
use anyhow::Result;

pub fn execute(args: &ConnectionArgs, frequency_hz: u16, duration_ms: u16, json: bool) -> Result<()> {
    let mut session = args.session()?;
    session.connect().map_err(CliError::from)?;
    session
        .play_tone(frequency_hz, duration_ms)
        .map_err(CliError::from)?;
    session.disconnect();

    output::print_success(
        &format!("Played {frequency_hz} Hz for {duration_ms} ms"),
        json,
    );
    Ok(())
}
