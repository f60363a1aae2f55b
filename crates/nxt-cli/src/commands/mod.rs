//! Command implementations for nxtctl

pub mod config;
pub mod probe;
pub mod run;
pub mod tone;

use crate::error::CliError;
use crate::serial::SerialOpener;
use nxt_throttle_session::{Session, SessionConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Where the brick is and how to talk to it.
#[derive(Debug, Clone)]
pub struct ConnectionArgs {
    pub port: String,
    pub baud: u32,
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn load_config(&self) -> Result<SessionConfig, CliError> {
        match &self.config {
            Some(path) => Ok(SessionConfig::load_from_path(path)?),
            None => Ok(SessionConfig::default()),
        }
    }

    pub fn session(&self) -> Result<Session, CliError> {
        let config = self.load_config()?;
        let opener = Arc::new(SerialOpener::new(self.port.clone(), self.baud));
        Ok(Session::new(config, opener)?)
    }
}
