//! # FrSky Wire Layer
//!
//! Everything that touches bytes on the wire:
//! - Protocol constants and per-variant framing rules
//! - S.Port checksum
//! - Frame building (header, byte-stuffing, trailer)
//! - Bit-lane packing of payload words
//! - A frame checker for verifying captured output

pub mod codec;
pub mod crc;
pub mod decoder;
pub mod packer;
pub mod protocol;
