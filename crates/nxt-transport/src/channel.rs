//! Duplex byte channel traits

use crate::TransportResult;
use nxt_throttle_protocol::ResponseLayout;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with every inbound transfer on an endpoint channel.
pub type ReceiveHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// How responses arrive on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportFlavor {
    /// Blocking byte stream (Bluetooth serial). Replies are read back after
    /// each write and carry the two-byte length prefix.
    #[default]
    Stream,
    /// Transfer-oriented channel (USB bulk endpoint). Replies arrive
    /// asynchronously through a [`ReceiveHandler`] without a length prefix.
    Endpoint,
}

impl TransportFlavor {
    /// Reply layout this flavor normally produces.
    pub fn default_layout(self) -> ResponseLayout {
        match self {
            Self::Stream => ResponseLayout::LengthPrefixed,
            Self::Endpoint => ResponseLayout::Endpoint,
        }
    }

    pub fn is_event_driven(self) -> bool {
        matches!(self, Self::Endpoint)
    }
}

impl fmt::Display for TransportFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Endpoint => write!(f, "endpoint"),
        }
    }
}

/// An open duplex channel to the brick.
///
/// Methods take `&self` so one channel can be shared between the requester
/// and the heartbeat thread. Implementations synchronize internally.
pub trait Channel: Send + Sync {
    fn flavor(&self) -> TransportFlavor;

    fn write(&self, data: &[u8]) -> TransportResult<()>;

    /// Read up to `max_len` bytes. An empty buffer means the read timed out
    /// with no data.
    fn read(&self, max_len: usize) -> TransportResult<Vec<u8>>;

    /// Install the inbound transfer callback on an endpoint channel.
    fn set_receive_handler(&self, _handler: ReceiveHandler) -> TransportResult<()> {
        Err(crate::TransportError::Unsupported("receive callbacks"))
    }

    fn is_connected(&self) -> bool;

    fn close(&self) -> TransportResult<()>;
}

/// Opens channels on demand so connection attempts can be retried.
pub trait ChannelOpener: Send + Sync {
    fn open(&self) -> TransportResult<Arc<dyn Channel>>;

    /// The live channel behind an [`TransportError::AlreadyOpen`] report, if
    /// this opener can hand it out.
    ///
    /// [`TransportError::AlreadyOpen`]: crate::TransportError::AlreadyOpen
    fn current(&self) -> Option<Arc<dyn Channel>> {
        None
    }

    /// Human readable endpoint description for logs.
    fn describe(&self) -> String;
}
