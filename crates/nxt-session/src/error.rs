//! Session error types

use crate::config::ConfigError;
use nxt_throttle_calibration::StateError;
use nxt_throttle_protocol::ProtocolError;
use nxt_throttle_transport::TransportError;
use thiserror::Error;

/// Opening the channel failed on every attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Failed to open {endpoint} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        last_error: String,
    },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Not connected")]
    NotConnected,

    #[error("Session already running")]
    AlreadyRunning,

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;
