use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use skyscan_core::encoding::AzimuthEncoding;
use skyscan_core::DishError;
use tokio_serial::SerialPort;
use tracing::{debug, info};

use crate::channel::CommandChannel;
use crate::protocol::{HALT, LINE_END};
use crate::timing::Timing;

/// Byte stream to the dish that can report how much input is buffered.
pub trait Transport: Read + Write + Send {
    fn bytes_waiting(&mut self) -> io::Result<usize>;
}

impl Transport for Box<dyn SerialPort> {
    fn bytes_waiting(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }
}

/// An open link whose device has not yet been put into terminal mode.
pub struct SerialLink<T: Transport> {
    transport: T,
    port: String,
}

impl SerialLink<Box<dyn SerialPort>> {
    pub fn open(port: &str, baud: u32) -> Result<Self, DishError> {
        let transport = tokio_serial::new(port, baud)
            .timeout(Duration::from_millis(1000))
            .open()
            .map_err(|e| DishError::Connection { port: port.to_string(), reason: e.to_string() })?;
        info!("link: opened {} @ {}", port, baud);
        Ok(Self { transport, port: port.to_string() })
    }
}

impl<T: Transport> SerialLink<T> {
    pub fn from_transport(transport: T, port: impl Into<String>) -> Self {
        Self { transport, port: port.into() }
    }

    /// Sends `halt`, waits out the boot sequence and throws away the boot log.
    pub fn enter_terminal_mode(mut self, timing: Timing, encoding: AzimuthEncoding) -> Result<SerialChannel<T>, DishError> {
        let boot_log = exchange(&mut self.transport, HALT, timing.halt)?;
        debug!("link: discarded {} bytes of boot output", boot_log.len());
        info!("link: {} in terminal mode", self.port);
        Ok(SerialChannel { transport: self.transport, port: self.port, timing, encoding })
    }
}

/// Channel over a real serial port.
pub type DishChannel = SerialChannel<Box<dyn SerialPort>>;

/// Terminal-mode command channel over a serial transport.
pub struct SerialChannel<T: Transport> {
    transport: T,
    port: String,
    timing: Timing,
    encoding: AzimuthEncoding,
}

impl<T: Transport> SerialChannel<T> {
    pub fn port(&self) -> &str {
        &self.port
    }
}

impl<T: Transport> CommandChannel for SerialChannel<T> {
    fn send(&mut self, command: &str, settle: Duration) -> Result<String, DishError> {
        exchange(&mut self.transport, command, settle)
    }

    fn timing(&self) -> &Timing {
        &self.timing
    }

    fn azimuth_encoding(&self) -> AzimuthEncoding {
        self.encoding
    }
}

fn exchange<T: Transport>(transport: &mut T, command: &str, settle: Duration) -> Result<String, DishError> {
    let stale = drain(transport)?;
    if !stale.is_empty() {
        debug!("link: dropped {} stale bytes before {:?}", stale.len(), command);
    }

    transport.write_all(command.as_bytes())?;
    transport.write_all(LINE_END.as_bytes())?;
    transport.flush()?;
    thread::sleep(settle);

    let bytes = drain(transport)?;
    let response = String::from_utf8_lossy(&bytes).into_owned();
    debug!("link: {:?} -> {:?}", command, response);
    Ok(response)
}

fn drain<T: Transport>(transport: &mut T) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let waiting = transport.bytes_waiting()?;
        if waiting == 0 {
            return Ok(out);
        }
        let mut buf = vec![0u8; waiting];
        let n = transport.read(&mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}

/// Names of the serial ports the OS reports.
pub fn available_ports() -> Vec<String> {
    tokio_serial::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}
