//! Background requester for a running session
//!
//! On stream channels the requester polls: it writes a query, reads the
//! reply inline and records it. On endpoint channels it only writes queries;
//! replies land through the receive callback installed at connect. Either
//! way the requester is the one place that decodes percentages and hands
//! changes to the sink, so the receive context never runs caller code.

use crate::SessionResult;
use crate::axes::AxisTable;
use crate::error::SessionError;
use crate::heartbeat::Heartbeat;
use crate::sink::{AxisSink, AxisUpdate};
use crate::stats::SessionStats;
use nxt_throttle_calibration::{AxisDecoder, AxisId};
use nxt_throttle_transport::{DeviceLink, TransportError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything the requester loop reads or updates.
#[derive(Clone)]
pub(crate) struct RequesterContext {
    pub link: Arc<DeviceLink>,
    pub axes: Arc<AxisTable>,
    pub stats: Arc<SessionStats>,
    pub sink: Arc<dyn AxisSink>,
    pub decoder: AxisDecoder,
    pub leeway: i32,
    pub poll_interval: Duration,
}

pub(crate) struct SessionWorker {
    running: Arc<AtomicBool>,
    requester: Option<JoinHandle<()>>,
    heartbeat: Heartbeat,
}

impl SessionWorker {
    pub fn spawn(ctx: RequesterContext, heartbeat_interval: Duration) -> SessionResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let heartbeat = Heartbeat::spawn(
            Arc::clone(&ctx.link),
            Arc::clone(&ctx.stats),
            heartbeat_interval,
        )?;

        let flag = Arc::clone(&running);
        let requester = std::thread::Builder::new()
            .name("nxt-requester".to_string())
            .spawn(move || run_requester(&ctx, &flag))
            .map_err(|source| SessionError::Spawn {
                name: "requester",
                source,
            })?;

        Ok(Self {
            running,
            requester: Some(requester),
            heartbeat,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clear the continue flag and wait for the current iteration to finish.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.heartbeat.stop();
        if let Some(handle) = self.requester.take()
            && handle.join().is_err()
        {
            warn!("requester thread panicked");
        }
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_requester(ctx: &RequesterContext, running: &AtomicBool) {
    let event_driven = ctx.link.flavor().is_event_driven();
    info!(flavor = %ctx.link.flavor(), "session loop started");

    while running.load(Ordering::Acquire) {
        for axis in AxisId::ALL {
            if !running.load(Ordering::Acquire) {
                break;
            }
            if event_driven {
                request(ctx, axis);
            } else {
                poll(ctx, axis);
            }
            emit_if_changed(ctx, axis);
        }
        std::thread::sleep(ctx.poll_interval);
    }

    info!("session loop stopped");
}

fn poll(ctx: &RequesterContext, axis: AxisId) {
    ctx.stats.inc_query();
    match ctx.link.query_motor_position(axis.port()) {
        Ok(reply) => {
            ctx.stats.inc_reply();
            ctx.axes.observe(axis, reply.rotation_count, ctx.leeway);
        }
        Err(e) => record_failure(ctx, axis, &e),
    }
}

fn request(ctx: &RequesterContext, axis: AxisId) {
    ctx.stats.inc_query();
    if let Err(e) = ctx.link.request_motor_position(axis.port()) {
        record_failure(ctx, axis, &e);
    }
}

fn record_failure(ctx: &RequesterContext, axis: AxisId, error: &TransportError) {
    if error.is_protocol() {
        ctx.stats.inc_protocol_error();
        warn!(axis = %axis, error = %error, "reply discarded");
    } else {
        ctx.stats.inc_io_error();
        warn!(axis = %axis, error = %error, "query failed");
    }
}

fn emit_if_changed(ctx: &RequesterContext, axis: AxisId) {
    if let Some((raw_ticks, percent)) = ctx.axes.take_change(axis, &ctx.decoder) {
        debug!(axis = %axis, raw_ticks, percent, "axis changed");
        ctx.sink.publish(&AxisUpdate {
            axis,
            raw_ticks,
            percent,
        });
    }
}
