//! Async byte I/O on the receiver UART
//!
//! [`TelemetrySerial`](super::TelemetrySerial) is generic over
//! [`SerialPortIO`] so the link can run against the in-memory `MockSerialPort`
//! in tests.

use async_trait::async_trait;
use std::io;

/// Async half-duplex link to the receiver
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write encoded frames in full
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Push queued bytes onto the wire
    async fn flush(&mut self) -> io::Result<()>;

    /// Wait for poll bytes from the receiver and copy them into `buf`
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Receiver link over a `tokio_serial::SerialStream`
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;
        self.port.read(buf).await
    }
}
