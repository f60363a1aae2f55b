//! Transport seam between the NXT command link and the byte channel below it
//!
//! The session core never opens ports itself. It is handed a
//! [`ChannelOpener`], and everything it sends or receives goes through a
//! [`DeviceLink`] that serializes writes and pairs each query with its reply.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod channel;
pub mod link;
pub mod mock;
pub mod reader;

pub use channel::*;
pub use link::*;
pub use reader::*;

use nxt_throttle_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open channel: {0}")]
    OpenFailed(String),

    #[error("Channel already open")]
    AlreadyOpen,

    #[error("Failed to read from channel: {0}")]
    ReadError(String),

    #[error("Failed to write to channel: {0}")]
    WriteError(String),

    #[error("Unsupported by this channel: {0}")]
    Unsupported(&'static str),

    #[error("Channel disconnected")]
    Disconnected,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the failure came from decoding rather than from the channel.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = TransportError::OpenFailed("COM3".to_string());
        assert_eq!(format!("{}", err), "Failed to open channel: COM3");

        let err = TransportError::Disconnected;
        assert_eq!(format!("{}", err), "Channel disconnected");
    }

    #[test]
    fn test_protocol_error_conversion() {
        let err: TransportError = ProtocolError::Truncated {
            expected: 27,
            actual: 0,
        }
        .into();
        assert!(err.is_protocol());
        assert!(!TransportError::Disconnected.is_protocol());
    }
}
