//! Connect, calibrate and stream an NXT throttle quadrant
//!
//! [`Session`] owns the channel and walks the setup cycle:
//!
//! 1. [`Session::begin_setup`] opens the channel and forgets old calibration.
//! 2. [`Session::calibrate_backward`] zeroes each motor at its backward stop.
//! 3. [`Session::calibrate_forward`] reads each forward stop and infers
//!    direction and travel.
//!
//! [`Session::start_session`] then polls (stream channels) or requests and
//! receives (endpoint channels) positions in the background, with a
//! keep-alive heartbeat armed for as long as the session runs.
//!
//! ```no_run
//! use nxt_throttle_calibration::AxisId;
//! use nxt_throttle_session::{Session, SessionConfig};
//! use nxt_throttle_transport::mock::{MockChannel, MockOpener};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opener = Arc::new(MockOpener::new(MockChannel::stream()));
//! let mut session = Session::new(SessionConfig::default(), opener)?;
//! session.begin_setup()?;
//! session.calibrate_backward()?;
//! session.calibrate_forward()?;
//! session.start_session()?;
//! println!("throttle at {}%", session.get_axis_percent(AxisId::Throttle));
//! session.stop_session();
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]

pub mod axes;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod session;
pub mod sink;
pub mod stats;
mod worker;

pub use axes::{AxisRecord, AxisTable};
pub use config::{ConfigError, DEVICE_MIN_SLEEP_TIMEOUT_MS, SessionConfig};
pub use error::{ConnectError, SessionError, SessionResult};
pub use heartbeat::Heartbeat;
pub use session::Session;
pub use sink::{AxisSink, AxisUpdate, ChannelSink, NullSink};
pub use stats::{SessionStats, StatsSnapshot};
