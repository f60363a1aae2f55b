//! Raw position probe, no calibration required

use super::ConnectionArgs;
use crate::error::CliError;
use crate::output;
use anyhow::Result;
use nxt_throttle_calibration::AxisId;
use std::time::{Duration, Instant};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub fn execute(args: &ConnectionArgs, json: bool) -> Result<()> {
    let mut session = args.session()?;
    session.connect().map_err(CliError::from)?;
    session.start_session().map_err(CliError::from)?;

    let deadline = Instant::now() + PROBE_TIMEOUT;
    while Instant::now() < deadline
        && AxisId::ALL
            .iter()
            .any(|axis| session.raw_ticks(*axis).is_none())
    {
        std::thread::sleep(session.config().poll_interval());
    }
    session.stop_session();

    let positions: Vec<_> = AxisId::ALL
        .iter()
        .map(|axis| (*axis, session.raw_ticks(*axis)))
        .collect();
    output::print_raw_positions(&positions, json);
    if !json {
        output::print_stats(&session.stats(), json);
    }
    session.disconnect();
    Ok(())
}
