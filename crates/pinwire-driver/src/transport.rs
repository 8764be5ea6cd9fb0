//! Byte-stream transport capability.
//!
//! The engine only needs to write bytes, read bytes with a bounded wait, and
//! drop stale input. [`SerialTransport`] provides that over a serial port;
//! [`SimulatedBoard`](crate::sim::SimulatedBoard) provides it in memory.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::error::DriverError;

/// A half-duplex byte stream the engine can drive.
///
/// Implementations are owned by exactly one engine and are never shared
/// between threads without external serialization.
pub trait Transport: Send {
    /// Identifier used in logs and errors (e.g. `/dev/ttyACM0`).
    fn name(&self) -> &str;

    /// Write every byte, giving up after `timeout`.
    fn write_all(&mut self, bytes: &[u8], timeout: Duration) -> io::Result<()>;

    /// Read whatever is available, waiting at most `timeout` for the first
    /// byte. Returns `Ok(0)` or an error of kind `TimedOut`/`WouldBlock` when
    /// nothing arrived.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Drop any bytes received but not yet read.
    fn discard_input(&mut self) -> io::Result<()>;

    /// Push buffered output onto the wire.
    fn flush(&mut self) -> io::Result<()>;

    /// Release the underlying resource. Further calls fail.
    fn close(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_all(&mut self, bytes: &[u8], timeout: Duration) -> io::Result<()> {
        (**self).write_all(bytes, timeout)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read(buf, timeout)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Serial port transport, 8N1 without flow control.
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    /// Timeout currently programmed into the port, to avoid redundant ioctls.
    current_timeout: Duration,
}

impl SerialTransport {
    /// Open `name` at `baud_rate`.
    pub fn open(name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, DriverError> {
        debug!(port = name, baud_rate, "opening serial port");
        let port = serialport::new(name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| DriverError::TransportUnavailable {
                port: name.to_string(),
                source: e.into(),
            })?;

        Ok(SerialTransport {
            name: name.to_string(),
            port: Some(port),
            current_timeout: timeout,
        })
    }

    fn port(&mut self, timeout: Duration) -> io::Result<&mut Box<dyn SerialPort>> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port closed"))?;
        if timeout != self.current_timeout {
            port.set_timeout(timeout)?;
            self.current_timeout = timeout;
        }
        Ok(port)
    }
}

impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&mut self, bytes: &[u8], timeout: Duration) -> io::Result<()> {
        Write::write_all(self.port(timeout)?, bytes)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        if timeout.is_zero() {
            return Err(io::ErrorKind::TimedOut.into());
        }
        Read::read(self.port(timeout)?, buf)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        let timeout = self.current_timeout;
        self.port(timeout)?.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        let timeout = self.current_timeout;
        Write::flush(self.port(timeout)?)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.port.take() {
            Some(mut port) => Write::flush(&mut port),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}
