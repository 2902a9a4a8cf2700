//! # Serial Communication Module
//!
//! Handles the UART link to the FrSky receiver.
//!
//! This module handles:
//! - Opening the serial port at the protocol's baud rate (8N1)
//! - The non-blocking [`Transport`] the encoder writes frames into
//! - Moving bytes between that transport and the async port

pub mod port_trait;
pub mod transport;

pub use port_trait::{SerialPortIO, TokioSerialPort};
pub use transport::{LinkBuffer, Transport};

use crate::error::{Result, TelemetryError};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, trace, warn};

/// Serial link to the receiver
pub struct TelemetrySerial<P: SerialPortIO = TokioSerialPort> {
    port: P,
    device_path: String,
    bytes_sent: u64,
    bytes_received: u64,
}

impl<P: SerialPortIO> std::fmt::Debug for TelemetrySerial<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetrySerial")
            .field("device_path", &self.device_path)
            .field("bytes_sent", &self.bytes_sent)
            .field("bytes_received", &self.bytes_received)
            .finish_non_exhaustive()
    }
}

impl TelemetrySerial<TokioSerialPort> {
    /// Open the receiver's serial port
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if the device cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use frsky_telem::serial::TelemetrySerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = TelemetrySerial::open("/dev/ttyS1", 57_600)?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(&[path], baud_rate)
    }

    /// Open the first of `paths` that works
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened receiver link at {} ({} baud)", path, baud_rate);
                    return Ok(Self::from_port(TokioSerialPort::new(port), path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(TelemetryError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TelemetryError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<P: SerialPortIO> TelemetrySerial<P> {
    pub fn from_port(port: P, device_path: &str) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// Write encoded bytes to the receiver
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the write or flush fails
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        self.port
            .write_all(data)
            .await
            .map_err(|e| TelemetryError::Serial(format!("Failed to write: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| TelemetryError::Serial(format!("Failed to flush serial port: {}", e)))?;

        self.bytes_sent += data.len() as u64;
        trace!("Sent {} bytes", data.len());
        Ok(())
    }

    /// Read received bytes (polls, for S.Port) into `buf`
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the read fails
    pub async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let count = self
            .port
            .read(buf)
            .await
            .map_err(|e| TelemetryError::Serial(format!("Failed to read: {}", e)))?;

        self.bytes_received += count as u64;
        Ok(count)
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}
