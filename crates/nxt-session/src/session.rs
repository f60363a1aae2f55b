//! Session façade
//!
//! Owns the channel for its lifetime and drives the connect and calibrate
//! cycle. Calibration steps are explicit calls; the background loop never
//! changes [`SessionState`].

use crate::axes::AxisTable;
use crate::config::SessionConfig;
use crate::error::{ConnectError, SessionError, SessionResult};
use crate::sink::{AxisSink, NullSink};
use crate::stats::{SessionStats, StatsSnapshot};
use crate::worker::{RequesterContext, SessionWorker};
use nxt_throttle_calibration::{
    AxisDecoder, AxisId, CalibrationStep, SessionState, UNAVAILABLE_PERCENT,
};
use nxt_throttle_protocol::ResponseLayout;
use nxt_throttle_transport::{
    Channel, ChannelOpener, DeviceLink, PositionHandler, TransportError, TransportFlavor,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct Session {
    config: SessionConfig,
    layout: ResponseLayout,
    decoder: AxisDecoder,
    opener: Arc<dyn ChannelOpener>,
    sink: Arc<dyn AxisSink>,
    link: Option<Arc<DeviceLink>>,
    state: SessionState,
    axes: Arc<AxisTable>,
    stats: Arc<SessionStats>,
    worker: Option<SessionWorker>,
}

impl Session {
    pub fn new(config: SessionConfig, opener: Arc<dyn ChannelOpener>) -> SessionResult<Self> {
        config.validate()?;
        let layout = config.layout()?;
        Ok(Self {
            decoder: AxisDecoder::new(config.throttle_dead_zone_percent),
            config,
            layout,
            opener,
            sink: Arc::new(NullSink),
            link: None,
            state: SessionState::Idle,
            axes: Arc::new(AxisTable::new()),
            stats: Arc::new(SessionStats::new()),
            worker: None,
        })
    }

    /// Route changed axis percentages to `sink`. Takes effect on the next
    /// [`Session::start_session`].
    pub fn with_sink(mut self, sink: Arc<dyn AxisSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.is_connected())
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(SessionWorker::is_running)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Open the channel, retrying up to `connect_attempts` times.
    ///
    /// Succeeds immediately when a live channel is already held, and treats
    /// an "already open" report from the opener as success when the opener
    /// can hand over the live channel.
    pub fn connect(&mut self) -> SessionResult<()> {
        if self.is_connected() {
            debug!("connect called while connected");
            return Ok(());
        }

        let endpoint = self.opener.describe();
        let attempts = self.config.connect_attempts;
        let mut last_error = TransportError::Disconnected;

        for attempt in 1..=attempts {
            match self.opener.open() {
                Ok(channel) => {
                    info!(endpoint = %endpoint, attempt, "channel opened");
                    return self.install(channel);
                }
                Err(TransportError::AlreadyOpen) => match self.opener.current() {
                    Some(channel) => {
                        info!(endpoint = %endpoint, attempt, "channel already open, reusing it");
                        return self.install(channel);
                    }
                    None => {
                        warn!(endpoint = %endpoint, attempt, "channel reported open by another owner");
                        last_error = TransportError::AlreadyOpen;
                    }
                },
                Err(e) => {
                    warn!(endpoint = %endpoint, attempt, error = %e, "failed to open channel");
                    last_error = e;
                }
            }
            if attempt < attempts {
                std::thread::sleep(self.config.connect_retry_delay());
            }
        }

        error!(endpoint = %endpoint, attempts, "giving up on channel");
        Err(ConnectError::RetriesExhausted {
            endpoint,
            attempts,
            last_error: last_error.to_string(),
        }
        .into())
    }

    fn install(&mut self, channel: Arc<dyn Channel>) -> SessionResult<()> {
        let flavor = channel.flavor();
        if flavor.default_layout() != self.layout {
            warn!(
                flavor = %flavor,
                rotation_offset = self.config.rotation_offset,
                "rotation offset does not match the channel's usual reply layout"
            );
        }

        let link = Arc::new(DeviceLink::new(channel, self.layout));
        if flavor == TransportFlavor::Endpoint {
            link.subscribe_positions(self.position_handler())?;
        }
        self.link = Some(link);
        Ok(())
    }

    /// Receive callback for endpoint channels: decode, update the matching
    /// axis record and return.
    fn position_handler(&self) -> PositionHandler {
        let axes = Arc::clone(&self.axes);
        let stats = Arc::clone(&self.stats);
        let leeway = self.config.leeway_ticks;

        Arc::new(move |outcome| match outcome {
            Ok(reply) => match AxisId::from_port(reply.port) {
                Some(axis) => {
                    stats.inc_reply();
                    axes.observe(axis, reply.rotation_count, leeway);
                }
                None => {
                    stats.inc_protocol_error();
                    warn!(port = reply.port, "reply for unknown port discarded");
                }
            },
            Err(e) => {
                stats.inc_protocol_error();
                warn!(error = %e, "reply discarded");
            }
        })
    }

    fn link(&self) -> SessionResult<Arc<DeviceLink>> {
        self.link.clone().ok_or(SessionError::NotConnected)
    }

    /// Start (or restart) calibration: (re)open the channel and forget every
    /// axis's calibration.
    ///
    /// Restarting from Ready drops back to Idle before reconnecting, so a
    /// failed reopen leaves an idle session with nothing calibrated.
    pub fn begin_setup(&mut self) -> SessionResult<()> {
        let next = self.state.transition(CalibrationStep::BeginSetup)?;

        if self.state.is_ready() {
            self.stop_session();
            self.close_link();
            self.state = SessionState::Idle;
        }
        self.axes.reset_all();
        self.connect()?;

        info!(from = %self.state, to = %next, "setup started");
        self.state = next;
        Ok(())
    }

    /// Zero every motor with the levers held at their backward stop.
    pub fn calibrate_backward(&mut self) -> SessionResult<()> {
        let next = self.state.transition(CalibrationStep::CalibrateBackward)?;
        let link = self.link()?;

        for axis in AxisId::ALL {
            link.reset_motor_position(axis.port())?;
            self.axes.clear_runtime(axis);
            debug!(axis = %axis, "motor position reset");
        }

        info!(from = %self.state, to = %next, "backward extreme captured");
        self.state = next;
        Ok(())
    }

    /// Read every axis at its forward stop and infer direction and travel.
    ///
    /// On stream channels all three readings must succeed before any axis is
    /// updated. On endpoint channels the queries are sent and each axis is
    /// calibrated when its reply arrives.
    pub fn calibrate_forward(&mut self) -> SessionResult<()> {
        let next = self.state.transition(CalibrationStep::CalibrateForward)?;
        let link = self.link()?;
        let leeway = self.config.leeway_ticks;

        if link.flavor().is_event_driven() {
            for axis in AxisId::ALL {
                self.axes.set_pending_forward(axis, true);
            }
            for axis in AxisId::ALL {
                self.stats.inc_query();
                if let Err(e) = link.request_motor_position(axis.port()) {
                    for axis in AxisId::ALL {
                        self.axes.set_pending_forward(axis, false);
                    }
                    return Err(e.into());
                }
            }
        } else {
            let mut readings = Vec::with_capacity(AxisId::ALL.len());
            for axis in AxisId::ALL {
                self.stats.inc_query();
                let reply = link.query_motor_position(axis.port())?;
                self.stats.inc_reply();
                readings.push((axis, reply.rotation_count));
            }
            for (axis, raw_forward) in readings {
                self.axes.apply_forward(axis, raw_forward, leeway);
            }
        }

        info!(from = %self.state, to = %next, "forward extreme captured");
        self.state = next;
        Ok(())
    }

    /// Perform whichever setup step is legal now, like the single setup
    /// button. Returns the new state and the instruction for the user.
    pub fn advance_setup(&mut self) -> SessionResult<(SessionState, &'static str)> {
        match self.state.next_step() {
            CalibrationStep::BeginSetup => self.begin_setup()?,
            CalibrationStep::CalibrateBackward => self.calibrate_backward()?,
            CalibrationStep::CalibrateForward => self.calibrate_forward()?,
        }
        Ok((self.state, self.state.prompt()))
    }

    /// Start the requester loop and arm the heartbeat.
    pub fn start_session(&mut self) -> SessionResult<()> {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        let link = self.link()?;

        let ctx = RequesterContext {
            link,
            axes: Arc::clone(&self.axes),
            stats: Arc::clone(&self.stats),
            sink: Arc::clone(&self.sink),
            decoder: self.decoder,
            leeway: self.config.leeway_ticks,
            poll_interval: self.config.poll_interval(),
        };
        self.worker = Some(SessionWorker::spawn(
            ctx,
            self.config.heartbeat_interval(),
        )?);
        info!("session started");
        Ok(())
    }

    /// Stop the loop and disarm the heartbeat. Returns once both threads
    /// have exited.
    pub fn stop_session(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            info!("session stopped");
        }
    }

    /// Last decoded percentage for `axis`, or `-1` when uncalibrated or
    /// before the first reading.
    pub fn get_axis_percent(&self, axis: AxisId) -> f64 {
        if self.link.is_none() {
            return UNAVAILABLE_PERCENT;
        }
        self.axes.reported_percent(axis, &self.decoder)
    }

    /// Like [`Session::get_axis_percent`] without the sentinel, for pitch
    /// whose valid range includes negative values.
    pub fn axis_percent(&self, axis: AxisId) -> Option<f64> {
        self.link.as_ref()?;
        self.axes.percent(axis, &self.decoder)
    }

    pub fn raw_ticks(&self, axis: AxisId) -> Option<i32> {
        self.axes.raw_ticks(axis)
    }

    /// Sound the brick's speaker.
    pub fn play_tone(&self, frequency_hz: u16, duration_ms: u16) -> SessionResult<()> {
        self.link()?.play_tone(frequency_hz, duration_ms)?;
        Ok(())
    }

    /// Stop any running session, close the channel and discard calibration.
    pub fn disconnect(&mut self) {
        self.stop_session();
        self.close_link();
        self.axes.reset_all();
        self.state = SessionState::Idle;
    }

    fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            match link.close() {
                Ok(()) => info!("channel closed"),
                Err(e) => warn!(error = %e, "failed to close channel"),
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_session();
        self.close_link();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("layout", &self.layout)
            .field("connected", &self.is_connected())
            .field("running", &self.is_running())
            .finish()
    }
}
