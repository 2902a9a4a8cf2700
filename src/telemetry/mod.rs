//! # Telemetry Module
//!
//! Protocol-independent telemetry logic:
//! - Vehicle data sources the encoder reads from
//! - Payload words built from them
//! - Group scheduling for the push protocol
//! - The status text queue and the sensor health announcer

pub mod health;
pub mod payload;
pub mod scheduler;
pub mod status_text;
pub mod vehicle;
