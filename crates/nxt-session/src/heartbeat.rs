//! Periodic keep-alive while a session runs

use crate::SessionResult;
use crate::error::SessionError;
use crate::stats::SessionStats;
use crossbeam::channel::{Sender, bounded, select, tick};
use nxt_throttle_transport::DeviceLink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Keep-alive thread. Disarming stops new sends; a send already in flight
/// is allowed to finish.
pub struct Heartbeat {
    armed: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn spawn(
        link: Arc<DeviceLink>,
        stats: Arc<SessionStats>,
        interval: Duration,
    ) -> SessionResult<Self> {
        let armed = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let thread_armed = Arc::clone(&armed);

        let handle = std::thread::Builder::new()
            .name("nxt-heartbeat".to_string())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            if !thread_armed.load(Ordering::Acquire) {
                                break;
                            }
                            match link.keep_alive() {
                                Ok(()) => {
                                    stats.inc_heartbeat();
                                    debug!("keep-alive sent");
                                }
                                Err(e) => warn!(error = %e, "keep-alive failed"),
                            }
                        }
                    }
                }
                debug!("heartbeat stopped");
            })
            .map_err(|source| SessionError::Spawn {
                name: "heartbeat",
                source,
            })?;

        debug!(interval_ms = interval.as_millis() as u64, "heartbeat armed");
        Ok(Self {
            armed,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Disarm and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.armed.store(false, Ordering::Release);
        // Dropping the sender wakes the select.
        self.stop_tx.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("heartbeat thread panicked");
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxt_throttle_protocol::{DirectCommand, ResponseLayout};
    use nxt_throttle_transport::mock::MockChannel;

    #[test]
    fn test_heartbeat_sends_until_stopped() -> Result<(), Box<dyn std::error::Error>> {
        let channel = MockChannel::stream();
        let link = Arc::new(DeviceLink::new(
            Arc::new(channel.clone()),
            ResponseLayout::LengthPrefixed,
        ));
        let stats = Arc::new(SessionStats::new());

        let mut heartbeat = Heartbeat::spawn(link, Arc::clone(&stats), Duration::from_millis(2))?;
        std::thread::sleep(Duration::from_millis(40));
        heartbeat.stop();
        assert!(!heartbeat.is_armed());

        let sent = channel.writes_of(DirectCommand::KeepAlive);
        assert!(sent >= 1);
        assert_eq!(stats.snapshot().heartbeats_sent, sent as u64);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(channel.writes_of(DirectCommand::KeepAlive), sent);
        Ok(())
    }

    #[test]
    fn test_heartbeat_survives_write_failures() -> Result<(), Box<dyn std::error::Error>> {
        let channel = MockChannel::stream();
        channel.fail_next_writes(2);
        let link = Arc::new(DeviceLink::new(
            Arc::new(channel.clone()),
            ResponseLayout::LengthPrefixed,
        ));
        let stats = Arc::new(SessionStats::new());

        let mut heartbeat = Heartbeat::spawn(link, Arc::clone(&stats), Duration::from_millis(2))?;
        std::thread::sleep(Duration::from_millis(60));
        heartbeat.stop();

        assert!(channel.writes_of(DirectCommand::KeepAlive) >= 1);
        Ok(())
    }
}
