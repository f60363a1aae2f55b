//! Downstream consumers of axis changes

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use nxt_throttle_calibration::AxisId;
use serde::Serialize;
use tracing::trace;

/// One changed axis reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisUpdate {
    pub axis: AxisId,
    pub raw_ticks: i32,
    pub percent: f64,
}

/// Receives axis percentages whenever they change.
///
/// Called from the requester thread; implementations must not block for long.
pub trait AxisSink: Send + Sync {
    fn publish(&self, update: &AxisUpdate);
}

impl<F> AxisSink for F
where
    F: Fn(&AxisUpdate) + Send + Sync,
{
    fn publish(&self, update: &AxisUpdate) {
        self(update)
    }
}

/// Discards every update. Consumers poll `Session::axis_percent` instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AxisSink for NullSink {
    fn publish(&self, _update: &AxisUpdate) {}
}

/// Forwards updates over a bounded crossbeam channel, dropping updates when
/// the consumer falls behind.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<AxisUpdate>,
}

impl ChannelSink {
    pub fn bounded(capacity: usize) -> (Self, Receiver<AxisUpdate>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl AxisSink for ChannelSink {
    fn publish(&self, update: &AxisUpdate) {
        match self.sender.try_send(*update) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                trace!(axis = %dropped.axis, "axis sink full, update dropped");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(percent: f64) -> AxisUpdate {
        AxisUpdate {
            axis: AxisId::Throttle,
            raw_ticks: 10,
            percent,
        }
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, rx) = ChannelSink::bounded(4);
        sink.publish(&update(12.5));
        assert_eq!(rx.try_recv().ok(), Some(update(12.5)));
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sink, rx) = ChannelSink::bounded(1);
        sink.publish(&update(1.0));
        sink.publish(&update(2.0));
        assert_eq!(rx.len(), 1);
        assert_eq!(rx.try_recv().ok(), Some(update(1.0)));
    }

    #[test]
    fn test_closure_sink() {
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let captured = std::sync::Arc::clone(&seen);
        let sink = move |u: &AxisUpdate| captured.lock().push(u.percent);
        sink.publish(&update(50.0));
        assert_eq!(*seen.lock(), vec![50.0]);
    }

    #[test]
    fn test_update_serializes_snake_case_axis() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&update(50.0))?;
        assert_eq!(json, r#"{"axis":"throttle","raw_ticks":10,"percent":50.0}"#);
        Ok(())
    }
}
