//! # Error Types
//!
//! Custom error types for FrSky Telem using `thiserror`.
//!
//! Only initialization surfaces errors to the caller. The per-tick kinds
//! (`TransportUnavailable`, `QueueFull`, `UnknownPollId`) are produced
//! internally and logged, never propagated out of `tick()`.

use thiserror::Error;

/// Main error type for FrSky Telem
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Transport is not ready to carry bytes
    #[error("Transport unavailable")]
    TransportUnavailable,

    /// Status text queue has no free slot
    #[error("Status text queue full")]
    QueueFull,

    /// Poll for a sensor id this encoder does not serve
    #[error("Unknown poll id: 0x{0:02X}")]
    UnknownPollId(u8),

    /// Malformed frame seen by the frame checker
    #[error("Frame error: {0}")]
    Frame(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),
}

/// Result type alias for FrSky Telem
pub type Result<T> = std::result::Result<T, TelemetryError>;
