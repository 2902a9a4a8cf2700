//! # FrSky Telem Library
//!
//! Flight controller telemetry encoder for FrSky receivers.
//!
//! Converts vehicle state into the byte streams of three FrSky protocols:
//! D receivers (hub), X receivers (polled S.Port) and S.Port passthrough
//! for ground-station display scripts. The [`driver::Encoder`] is driven by
//! a fixed-rate tick and writes into a non-blocking [`serial::Transport`].

pub mod config;
pub mod driver;
pub mod error;
pub mod frsky;
pub mod serial;
pub mod telemetry;
