//! Serial-port channel to the brick (Bluetooth SPP or USB serial)

use nxt_throttle_transport::{Channel, ChannelOpener, TransportError, TransportFlavor, TransportResult};
use parking_lot::Mutex;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/rfcomm0";

pub const DEFAULT_BAUD: u32 = 115_200;

/// Reads give up after this long and report no data.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Stream channel over a serial port. Reads and writes use separate handles
/// to the same port so a blocked read never holds up a keep-alive.
///
/// Closing drops both handles, which releases the exclusive lock the port
/// was opened with.
pub struct SerialChannel {
    name: String,
    reader: Mutex<Option<Box<dyn SerialPort>>>,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    connected: AtomicBool,
}

impl SerialChannel {
    pub fn open(path: &str, baud: u32) -> TransportResult<Self> {
        let reader = serialport::new(path, baud)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| open_error(path, e))?;
        let writer = reader.try_clone().map_err(|e| open_error(path, e))?;

        debug!(port = path, baud, "serial port opened");
        Ok(Self::from_ports(path, reader, writer))
    }

    fn from_ports(name: &str, reader: Box<dyn SerialPort>, writer: Box<dyn SerialPort>) -> Self {
        Self {
            name: name.to_string(),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            connected: AtomicBool::new(true),
        }
    }

    fn io_error(&self, error: io::Error) -> TransportError {
        if matches!(
            error.kind(),
            io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof
        ) {
            self.connected.store(false, Ordering::Release);
            return TransportError::Disconnected;
        }
        TransportError::IoError(error)
    }
}

fn open_error(path: &str, error: serialport::Error) -> TransportError {
    match error.kind() {
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied)
        | serialport::ErrorKind::Io(io::ErrorKind::ResourceBusy) => TransportError::AlreadyOpen,
        _ => TransportError::OpenFailed(format!("{path}: {error}")),
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

impl Channel for SerialChannel {
    fn flavor(&self) -> TransportFlavor {
        TransportFlavor::Stream
    }

    fn write(&self, data: &[u8]) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        let mut writer = self.writer.lock();
        let port = writer.as_mut().ok_or(TransportError::Disconnected)?;
        port.write_all(data).map_err(|e| self.io_error(e))?;
        port.flush().map_err(|e| self.io_error(e))?;
        trace!(bytes = ?data, "serial write");
        Ok(())
    }

    fn read(&self, max_len: usize) -> TransportResult<Vec<u8>> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        let mut reader = self.reader.lock();
        let port = reader.as_mut().ok_or(TransportError::Disconnected)?;
        let mut buf = vec![0u8; max_len];
        let read = port.read(&mut buf);
        match read {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if is_timeout(&e) => Ok(Vec::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn close(&self) -> TransportResult<()> {
        self.connected.store(false, Ordering::Release);
        // Writer first: a read may be blocked on the reader for one timeout.
        self.writer.lock().take();
        self.reader.lock().take();
        debug!(port = %self.name, "serial port closed");
        Ok(())
    }
}

/// Opens the configured port, remembering the live channel so an
/// "already open" report can hand it back.
pub struct SerialOpener {
    path: String,
    baud: u32,
    current: Mutex<Option<Arc<SerialChannel>>>,
}

impl SerialOpener {
    pub fn new(path: impl Into<String>, baud: u32) -> Self {
        Self {
            path: path.into(),
            baud,
            current: Mutex::new(None),
        }
    }
}

impl ChannelOpener for SerialOpener {
    fn open(&self) -> TransportResult<Arc<dyn Channel>> {
        let channel = Arc::new(SerialChannel::open(&self.path, self.baud)?);
        *self.current.lock() = Some(Arc::clone(&channel));
        Ok(channel)
    }

    fn current(&self) -> Option<Arc<dyn Channel>> {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|channel| !channel.is_connected()) {
            current.take();
        }
        current
            .as_ref()
            .map(|channel| Arc::clone(channel) as Arc<dyn Channel>)
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.path, self.baud)
    }
}
