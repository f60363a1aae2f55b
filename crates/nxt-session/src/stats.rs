//! Session traffic counters
//!
//! Incremented from the requester, the receive callback and the heartbeat
//! without locking. `Relaxed` ordering is enough since nothing synchronizes on
//! the values.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub queries_sent: u64,
    pub replies_decoded: u64,
    pub protocol_errors: u64,
    pub io_errors: u64,
    pub heartbeats_sent: u64,
}

#[derive(Debug, Default)]
pub struct SessionStats {
    queries_sent: AtomicU64,
    replies_decoded: AtomicU64,
    protocol_errors: AtomicU64,
    io_errors: AtomicU64,
    heartbeats_sent: AtomicU64,
}

impl SessionStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queries_sent: AtomicU64::new(0),
            replies_decoded: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            io_errors: AtomicU64::new(0),
            heartbeats_sent: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn inc_query(&self) {
        self.queries_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_reply(&self) {
        self.replies_decoded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_io_error(&self) {
        self.io_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_heartbeat(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queries_sent: self.queries_sent.load(Ordering::Relaxed),
            replies_decoded: self.replies_decoded.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.queries_sent.store(0, Ordering::Relaxed);
        self.replies_decoded.store(0, Ordering::Relaxed);
        self.protocol_errors.store(0, Ordering::Relaxed);
        self.io_errors.store(0, Ordering::Relaxed);
        self.heartbeats_sent.store(0, Ordering::Relaxed);
    }
}
