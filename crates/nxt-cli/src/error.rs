//! Error types for nxtctl

use nxt_throttle_session::{ConfigError, SessionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Could not connect: {0}")]
    ConnectFailed(String),

    #[error("Calibration step failed: {0}")]
    CalibrationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Input closed before calibration finished")]
    InputClosed,

    #[error("Session error: {0}")]
    Session(SessionError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Connect(e) => Self::ConnectFailed(e.to_string()),
            SessionError::Config(e) => Self::InvalidConfiguration(e),
            SessionError::State(e) => Self::CalibrationFailed(e.to_string()),
            other => Self::Session(other),
        }
    }
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectFailed(_) => 2,
            Self::CalibrationFailed(_) | Self::InputClosed => 3,
            Self::InvalidConfiguration(_) | Self::JsonError(_) => 4,
            Self::Session(_) | Self::IoError(_) => 1,
        }
    }
}
