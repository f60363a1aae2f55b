//! Interactive calibration followed by streaming axis updates

use super::ConnectionArgs;
use crate::error::CliError;
use crate::output;
use anyhow::Result;
use crossbeam::channel::{Receiver, after, bounded, never, select};
use nxt_throttle_session::{AxisUpdate, ChannelSink, Session, SessionError};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const UPDATE_QUEUE: usize = 256;
const ACK_TONE_HZ: u16 = 880;
const ACK_TONE_MS: u16 = 120;

pub fn execute(args: &ConnectionArgs, duration_secs: Option<u64>, json: bool) -> Result<()> {
    let (sink, updates) = ChannelSink::bounded(UPDATE_QUEUE);
    let mut session = args.session()?.with_sink(Arc::new(sink));

    {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        calibrate(&mut session, &mut input, json)?;
    }

    session.start_session().map_err(CliError::from)?;
    if !json {
        match duration_secs {
            Some(secs) => output::print_success(&format!("Streaming for {secs} s"), json),
            None => output::print_success("Streaming, press Enter to stop", json),
        }
    }

    let timeout = match duration_secs {
        Some(secs) => after(Duration::from_secs(secs)),
        None => never::<Instant>(),
    };
    let enter = match duration_secs {
        Some(_) => never(),
        None => enter_signal(),
    };
    stream(&updates, &enter, &timeout, json);

    session.stop_session();
    output::print_stats(&session.stats(), json);
    session.disconnect();
    Ok(())
}

/// Walk the setup cycle, one step per line of input. A failed step is
/// reported and retried on the next line; only connect failures abort.
pub fn calibrate<R: BufRead>(
    session: &mut Session,
    input: &mut R,
    json: bool,
) -> Result<(), CliError> {
    output::print_setup_state(session.state(), json);

    while !session.state().is_ready() {
        if !wait_for_enter(input)? {
            return Err(CliError::InputClosed);
        }
        match session.advance_setup() {
            Ok((state, _)) => {
                acknowledge(session);
                output::print_setup_state(state, json);
            }
            Err(e @ SessionError::Connect(_)) => return Err(e.into()),
            Err(e) => {
                warn!(state = %session.state(), error = %e, "setup step failed");
                output::print_warning(&format!("{e}. Press Enter to retry."), json);
            }
        }
    }
    Ok(())
}

fn wait_for_enter<R: BufRead>(input: &mut R) -> Result<bool, CliError> {
    let mut line = String::new();
    Ok(input.read_line(&mut line)? > 0)
}

fn acknowledge(session: &Session) {
    if let Err(e) = session.play_tone(ACK_TONE_HZ, ACK_TONE_MS) {
        debug!(error = %e, "acknowledge tone not sent");
    }
}

fn enter_signal() -> Receiver<()> {
    let (tx, rx) = bounded(1);
    let spawned = std::thread::Builder::new()
        .name("nxtctl-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            if let Err(e) = io::stdin().read_line(&mut line) {
                debug!(error = %e, "stdin read failed");
            }
            if tx.send(()).is_err() {
                debug!("stream already stopped");
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "cannot watch stdin, stream runs until interrupted");
    }
    rx
}

fn stream(
    updates: &Receiver<AxisUpdate>,
    enter: &Receiver<()>,
    timeout: &Receiver<Instant>,
    json: bool,
) {
    loop {
        select! {
            recv(updates) -> update => match update {
                Ok(update) => output::print_update(&update, json),
                Err(_) => break,
            },
            recv(enter) -> _ => break,
            recv(timeout) -> _ => break,
        }
    }
}
