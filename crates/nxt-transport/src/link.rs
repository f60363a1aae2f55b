//! Serialized command link over a shared channel
//!
//! The requester and the heartbeat both write to the same channel. Every
//! write goes through one writer lock so packets never interleave, and on
//! stream channels a query holds the exchange lock until its reply has been
//! read back so replies pair with the query that produced them.

use crate::{Channel, ReceiveHandler, TransportError, TransportFlavor, TransportResult, read_frame};
use nxt_throttle_protocol::{
    Command, MotorPositionReply, ProtocolError, ResponseLayout, parse_motor_position,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Replies for other ports skipped while waiting on one query before giving up.
const MAX_STALE_REPLIES: usize = 8;

/// Callback for decoded motor position replies on endpoint channels.
pub type PositionHandler = Arc<dyn Fn(TransportResult<MotorPositionReply>) + Send + Sync>;

pub struct DeviceLink {
    channel: Arc<dyn Channel>,
    layout: ResponseLayout,
    write_lock: Mutex<()>,
    exchange_lock: Mutex<()>,
}

impl DeviceLink {
    pub fn new(channel: Arc<dyn Channel>, layout: ResponseLayout) -> Self {
        Self {
            channel,
            layout,
            write_lock: Mutex::new(()),
            exchange_lock: Mutex::new(()),
        }
    }

    pub fn layout(&self) -> ResponseLayout {
        self.layout
    }

    pub fn flavor(&self) -> TransportFlavor {
        self.channel.flavor()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Encode and write one command under the writer lock.
    pub fn send(&self, command: &Command) -> TransportResult<()> {
        let bytes = command.encode();
        let _writer = self.write_lock.lock();
        trace!(?command, len = bytes.len(), "writing command");
        self.channel.write(&bytes)
    }

    /// Query one motor and block until its reply has been read.
    ///
    /// Only meaningful on stream channels; endpoint channels deliver replies
    /// through [`DeviceLink::subscribe_positions`].
    ///
    /// A reply that missed an earlier query's read timeout is still buffered
    /// ahead of ours. Replies for other ports are discarded until ours arrives
    /// or the channel runs dry.
    pub fn query_motor_position(&self, port: u8) -> TransportResult<MotorPositionReply> {
        let _exchange = self.exchange_lock.lock();
        self.send(&Command::QueryMotorPosition { port })?;

        for _ in 0..=MAX_STALE_REPLIES {
            let frame = read_frame(self.channel.as_ref(), self.layout)?;
            let reply = parse_motor_position(self.layout, &frame)?;
            if reply.port == port {
                return Ok(reply);
            }
            debug!(expected = port, got = reply.port, "discarding stale reply");
        }
        Err(ProtocolError::Malformed(format!(
            "no reply for port {port} after {MAX_STALE_REPLIES} stale replies"
        ))
        .into())
    }

    /// Fire a position query without waiting; the reply arrives through the
    /// subscribed handler.
    pub fn request_motor_position(&self, port: u8) -> TransportResult<()> {
        self.send(&Command::QueryMotorPosition { port })
    }

    pub fn reset_motor_position(&self, port: u8) -> TransportResult<()> {
        self.send(&Command::ResetMotorPosition { port })
    }

    pub fn keep_alive(&self) -> TransportResult<()> {
        self.send(&Command::KeepAlive)
    }

    pub fn play_tone(&self, frequency_hz: u16, duration_ms: u16) -> TransportResult<()> {
        self.send(&Command::PlayTone {
            frequency_hz,
            duration_ms,
        })
    }

    /// Decode every inbound transfer as a motor position reply and hand the
    /// outcome to `handler`.
    pub fn subscribe_positions(&self, handler: PositionHandler) -> TransportResult<()> {
        if !self.flavor().is_event_driven() {
            return Err(TransportError::Unsupported(
                "position subscriptions on stream channels",
            ));
        }
        let layout = self.layout;
        let receive: ReceiveHandler = Arc::new(move |bytes: &[u8]| {
            let outcome = parse_motor_position(layout, bytes).map_err(TransportError::from);
            handler(outcome);
        });
        debug!(flavor = %self.flavor(), "subscribed to position replies");
        self.channel.set_receive_handler(receive)
    }

    pub fn close(&self) -> TransportResult<()> {
        let _writer = self.write_lock.lock();
        self.channel.close()
    }
}

impl std::fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("flavor", &self.flavor())
            .field("layout", &self.layout)
            .field("connected", &self.is_connected())
            .finish()
    }
}
