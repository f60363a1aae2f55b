//! In-memory channel, opener and simulated brick for tests

use crate::{Channel, ChannelOpener, ReceiveHandler, TransportError, TransportFlavor, TransportResult};
use nxt_throttle_protocol::{
    DirectCommand, LENGTH_PREFIX_LEN, MotorPositionReply, ResponseLayout,
    encode_motor_state_reply,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Produces the bytes a device would answer a written packet with.
pub type Responder = Arc<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

struct MockState {
    read_queue: Mutex<VecDeque<Vec<u8>>>,
    write_history: Mutex<Vec<Vec<u8>>>,
    connected: AtomicBool,
    handler: Mutex<Option<ReceiveHandler>>,
    responder: Mutex<Option<Responder>>,
    failing_writes: AtomicUsize,
}

/// Channel double. Clones share the same queues and history.
#[derive(Clone)]
pub struct MockChannel {
    flavor: TransportFlavor,
    max_chunk: usize,
    state: Arc<MockState>,
}

impl MockChannel {
    pub fn new(flavor: TransportFlavor) -> Self {
        Self {
            flavor,
            max_chunk: usize::MAX,
            state: Arc::new(MockState {
                read_queue: Mutex::new(VecDeque::new()),
                write_history: Mutex::new(Vec::new()),
                connected: AtomicBool::new(true),
                handler: Mutex::new(None),
                responder: Mutex::new(None),
                failing_writes: AtomicUsize::new(0),
            }),
        }
    }

    pub fn stream() -> Self {
        Self::new(TransportFlavor::Stream)
    }

    pub fn endpoint() -> Self {
        Self::new(TransportFlavor::Endpoint)
    }

    /// Cap every read at `max_chunk` bytes to exercise short reads.
    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    pub fn with_responder(self, responder: Responder) -> Self {
        *self.state.responder.lock() = Some(responder);
        self
    }

    pub fn queue_read(&self, data: Vec<u8>) {
        self.state.read_queue.lock().push_back(data);
    }

    pub fn pending_reads(&self) -> usize {
        self.state.read_queue.lock().len()
    }

    pub fn write_history(&self) -> Vec<Vec<u8>> {
        self.state.write_history.lock().clone()
    }

    pub fn clear_write_history(&self) {
        self.state.write_history.lock().clear();
    }

    /// Count written packets whose opcode byte matches `command`.
    pub fn writes_of(&self, command: DirectCommand) -> usize {
        self.state
            .write_history
            .lock()
            .iter()
            .filter(|packet| packet_opcode(packet) == Some(command.to_u8()))
            .count()
    }

    /// Make the next `count` writes fail with a write error.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Deliver a transfer to the installed receive handler, as an endpoint
    /// device would.
    pub fn emit(&self, data: &[u8]) -> bool {
        let handler = self.state.handler.lock().clone();
        match handler {
            Some(handler) => {
                handler(data);
                true
            }
            None => false,
        }
    }

    pub fn has_receive_handler(&self) -> bool {
        self.state.handler.lock().is_some()
    }

    pub fn disconnect(&self) {
        self.state.connected.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.state.connected.store(true, Ordering::SeqCst);
    }

    fn ensure_connected(&self) -> TransportResult<()> {
        if self.state.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }

    fn take_write_failure(&self) -> bool {
        self.state
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Channel for MockChannel {
    fn flavor(&self) -> TransportFlavor {
        self.flavor
    }

    fn write(&self, data: &[u8]) -> TransportResult<()> {
        self.ensure_connected()?;
        if self.take_write_failure() {
            return Err(TransportError::WriteError("injected failure".to_string()));
        }
        self.state.write_history.lock().push(data.to_vec());

        let responder = self.state.responder.lock().clone();
        if let Some(reply) = responder.and_then(|respond| respond(data)) {
            match self.flavor {
                TransportFlavor::Stream => self.queue_read(reply),
                TransportFlavor::Endpoint => {
                    self.emit(&reply);
                }
            }
        }
        Ok(())
    }

    fn read(&self, max_len: usize) -> TransportResult<Vec<u8>> {
        self.ensure_connected()?;
        let mut queue = self.state.read_queue.lock();
        let Some(mut chunk) = queue.pop_front() else {
            return Ok(Vec::new());
        };
        let take = max_len.min(self.max_chunk).min(chunk.len());
        let rest = chunk.split_off(take);
        if !rest.is_empty() {
            queue.push_front(rest);
        }
        Ok(chunk)
    }

    fn set_receive_handler(&self, handler: ReceiveHandler) -> TransportResult<()> {
        match self.flavor {
            TransportFlavor::Endpoint => {
                *self.state.handler.lock() = Some(handler);
                Ok(())
            }
            TransportFlavor::Stream => Err(TransportError::Unsupported("receive callbacks")),
        }
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> TransportResult<()> {
        self.disconnect();
        self.state.handler.lock().take();
        Ok(())
    }
}

fn packet_opcode(packet: &[u8]) -> Option<u8> {
    packet.get(LENGTH_PREFIX_LEN + 1).copied()
}

#[derive(Debug, Clone, Copy, Default)]
struct SimulatedMotor {
    absolute: i32,
    zero: i32,
}

/// Simulated brick answering position queries and honoring resets.
///
/// Lever positions are absolute; replies report them relative to the last
/// reset, the way the brick's rotation counter does.
pub struct MockBrick {
    layout: ResponseLayout,
    motors: Mutex<[SimulatedMotor; 3]>,
    reject_next: Mutex<Option<u8>>,
}

impl MockBrick {
    pub fn new(layout: ResponseLayout) -> Arc<Self> {
        Arc::new(Self {
            layout,
            motors: Mutex::new([SimulatedMotor::default(); 3]),
            reject_next: Mutex::new(None),
        })
    }

    pub fn move_lever(&self, port: u8, absolute: i32) {
        if let Some(motor) = self.motors.lock().get_mut(usize::from(port)) {
            motor.absolute = absolute;
        }
    }

    /// Rotation count the brick would currently report for `port`.
    pub fn rotation(&self, port: u8) -> Option<i32> {
        self.motors
            .lock()
            .get(usize::from(port))
            .map(|motor| motor.absolute.wrapping_sub(motor.zero))
    }

    /// Answer the next query with a non-zero status byte.
    pub fn reject_next_query(&self, status: u8) {
        *self.reject_next.lock() = Some(status);
    }

    pub fn respond(&self, packet: &[u8]) -> Option<Vec<u8>> {
        let opcode = packet_opcode(packet)?;
        let port = packet.get(LENGTH_PREFIX_LEN + 2).copied()?;

        match DirectCommand::from_u8(opcode)? {
            DirectCommand::GetOutputState => {
                let rotation = self.rotation(port)?;
                let mut reply = encode_motor_state_reply(
                    self.layout,
                    &MotorPositionReply {
                        port,
                        tacho_count: rotation,
                        rotation_count: rotation,
                    },
                );
                if let Some(status) = self.reject_next.lock().take() {
                    let status_at = self.layout.header_len() + 2;
                    if let Some(byte) = reply.get_mut(status_at) {
                        *byte = status;
                    }
                }
                Some(reply)
            }
            DirectCommand::ResetMotorPosition => {
                if let Some(motor) = self.motors.lock().get_mut(usize::from(port)) {
                    motor.zero = motor.absolute;
                }
                None
            }
            DirectCommand::PlayTone | DirectCommand::KeepAlive => None,
        }
    }

    pub fn responder(self: &Arc<Self>) -> Responder {
        let brick = Arc::clone(self);
        Arc::new(move |packet: &[u8]| brick.respond(packet))
    }
}

/// Opener double with scripted failures.
pub struct MockOpener {
    channel: MockChannel,
    failures_remaining: AtomicUsize,
    already_open: AtomicBool,
    attempts: AtomicUsize,
}

impl MockOpener {
    pub fn new(channel: MockChannel) -> Self {
        Self {
            channel,
            failures_remaining: AtomicUsize::new(0),
            already_open: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Fail the first `count` opens.
    pub fn failing(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    pub fn always_failing(self) -> Self {
        self.failing(usize::MAX)
    }

    /// Fail the next `count` opens from now on, e.g. a reopen after the
    /// device went away.
    pub fn fail_next_opens(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Report every open as already open, as a device held by this process
    /// would.
    pub fn already_open(self) -> Self {
        self.already_open.store(true, Ordering::SeqCst);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn channel(&self) -> &MockChannel {
        &self.channel
    }
}

impl ChannelOpener for MockOpener {
    fn open(&self) -> TransportResult<Arc<dyn Channel>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.already_open.load(Ordering::SeqCst) {
            return Err(TransportError::AlreadyOpen);
        }
        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(TransportError::OpenFailed(format!("mock attempt {attempt}")));
        }
        self.channel.reconnect();
        Ok(Arc::new(self.channel.clone()))
    }

    fn current(&self) -> Option<Arc<dyn Channel>> {
        self.already_open
            .load(Ordering::SeqCst)
            .then(|| Arc::new(self.channel.clone()) as Arc<dyn Channel>)
    }

    fn describe(&self) -> String {
        format!("mock {} channel", self.channel.flavor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_write_history() -> Result<(), Box<dyn std::error::Error>> {
        let channel = MockChannel::stream();
        channel.write(&[2, 0, 0x80, 0x0D])?;
        channel.write(&[3, 0, 0x00, 0x06, 1])?;

        assert_eq!(channel.write_history().len(), 2);
        assert_eq!(channel.writes_of(DirectCommand::KeepAlive), 1);
        assert_eq!(channel.writes_of(DirectCommand::GetOutputState), 1);
        Ok(())
    }

    #[test]
    fn test_mock_read_splits_chunks() -> Result<(), Box<dyn std::error::Error>> {
        let channel = MockChannel::stream();
        channel.queue_read(vec![1, 2, 3, 4, 5]);

        assert_eq!(channel.read(2)?, vec![1, 2]);
        assert_eq!(channel.read(10)?, vec![3, 4, 5]);
        assert!(channel.read(10)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_mock_injected_write_failure() {
        let channel = MockChannel::stream();
        channel.fail_next_writes(1);

        assert!(matches!(
            channel.write(&[0]),
            Err(TransportError::WriteError(_))
        ));
        assert!(channel.write(&[0]).is_ok());
        assert_eq!(channel.write_history().len(), 1);
    }

    #[test]
    fn test_mock_disconnect() {
        let channel = MockChannel::stream();
        channel.disconnect();
        assert!(!channel.is_connected());
        assert!(matches!(channel.write(&[0]), Err(TransportError::Disconnected)));
        channel.reconnect();
        assert!(channel.is_connected());
    }

    #[test]
    fn test_endpoint_emit_reaches_handler() -> Result<(), Box<dyn std::error::Error>> {
        let channel = MockChannel::endpoint();
        assert!(!channel.emit(&[1]));

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        channel.set_receive_handler(Arc::new(move |bytes: &[u8]| {
            counter.fetch_add(bytes.len(), Ordering::SeqCst);
        }))?;

        assert!(channel.emit(&[1, 2, 3]));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[test]
    fn test_brick_ignores_unknown_ports() {
        let brick = MockBrick::new(ResponseLayout::LengthPrefixed);
        assert!(brick.respond(&[3, 0, 0, 6, 9]).is_none());
        assert_eq!(brick.rotation(9), None);
    }

    #[test]
    fn test_opener_scripted_failures() {
        let opener = MockOpener::new(MockChannel::stream()).failing(2);

        assert!(opener.open().is_err());
        assert!(opener.open().is_err());
        assert!(opener.open().is_ok());
        assert_eq!(opener.attempts(), 3);
    }

    #[test]
    fn test_opener_already_open_exposes_current() {
        let opener = MockOpener::new(MockChannel::stream()).already_open();

        assert!(matches!(opener.open(), Err(TransportError::AlreadyOpen)));
        assert!(opener.current().is_some());
    }
}
