//! # FrSky Protocol Constants and Types
//!
//! Wire definitions shared by the three FrSky telemetry variants:
//!
//! - **D / hub** (D-series receivers, 9600 baud): `0x5E id lo hi`, no checksum
//! - **S.Port** (X-series receivers, 57600 baud): polled by the receiver with
//!   `0x7E <sensor id>`, answered with `0x10 id_lo id_hi d0 d1 d2 d3 crc`
//! - **S.Port passthrough**: same data frame, pushed proactively under the
//!   `0x7E 0x1B` header and carrying bit-packed `0x5000`-range words

use serde::Deserialize;

/// Hub frame start/stop delimiter
pub const HUB_START_STOP: u8 = 0x5E;

/// Hub byte-stuffing escape
pub const HUB_BYTESTUFF: u8 = 0x5D;

/// Hub escaped bytes are XORed with this mask
pub const HUB_ESCAPE_MASK: u8 = 0x60;

/// S.Port start/stop delimiter (also the poll header)
pub const SPORT_START_STOP: u8 = 0x7E;

/// S.Port byte-stuffing escape
pub const SPORT_BYTESTUFF: u8 = 0x7D;

/// S.Port escaped bytes are XORed with this mask
pub const SPORT_ESCAPE_MASK: u8 = 0x20;

/// S.Port data frame opcode
pub const SPORT_DATA_FRAME: u8 = 0x10;

/// Hub data ids (also reused as legacy S.Port data ids)
pub mod hub_id {
    pub const GPS_ALT_BP: u8 = 0x01;
    pub const TEMP1: u8 = 0x02;
    pub const FUEL: u8 = 0x04;
    pub const TEMP2: u8 = 0x05;
    pub const GPS_ALT_AP: u8 = 0x09;
    pub const BARO_ALT_BP: u8 = 0x10;
    pub const GPS_SPEED_BP: u8 = 0x11;
    pub const GPS_LONG_BP: u8 = 0x12;
    pub const GPS_LAT_BP: u8 = 0x13;
    pub const GPS_COURSE_BP: u8 = 0x14;
    pub const GPS_SPEED_AP: u8 = 0x19;
    pub const GPS_LONG_AP: u8 = 0x1A;
    pub const GPS_LAT_AP: u8 = 0x1B;
    pub const BARO_ALT_AP: u8 = 0x21;
    pub const GPS_LONG_EW: u8 = 0x22;
    pub const GPS_LAT_NS: u8 = 0x23;
    pub const CURRENT: u8 = 0x28;
    pub const VFAS: u8 = 0x39;
}

/// S.Port physical sensor ids answered by the polled driver
pub mod sensor_id {
    /// Sensor 0
    pub const VARIO: u8 = 0x00;
    /// Sensor 2
    pub const FAS: u8 = 0x22;
    /// Sensor 3
    pub const GPS: u8 = 0x83;
    /// Sensor 6
    pub const SP2UR: u8 = 0xC6;
    /// Sensor 28, the passthrough stream
    pub const PASSTHROUGH: u8 = 0x1B;
}

/// S.Port data ids
pub mod data_id {
    pub const ALT_FIRST: u16 = 0x0100;
    pub const VARIO_FIRST: u16 = 0x0110;
    pub const VFAS_FIRST: u16 = 0x0210;
    pub const GPS_LONG_LATI_FIRST: u16 = 0x0800;
    /// Passthrough "DIY" range; the low nibble selects the sub-stream
    pub const DIY_FIRST: u16 = 0x5000;
}

/// Telemetry protocol spoken on the link, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// FrSky D receivers, push on two fixed cadences
    Hub,
    /// FrSky X receivers, answered per poll
    Sport,
    /// S.Port passthrough for ground-station display scripts
    Passthrough,
}

impl Protocol {
    /// Native baud rate of the protocol
    pub fn default_baud_rate(self) -> u32 {
        match self {
            Protocol::Hub => 9_600,
            Protocol::Sport | Protocol::Passthrough => 57_600,
        }
    }

    /// Framing rules for this protocol
    pub fn frame_format(self) -> FrameFormat {
        match self {
            Protocol::Hub => HUB_FORMAT,
            Protocol::Sport => SPORT_POLLED_FORMAT,
            Protocol::Passthrough => SPORT_PUSH_FORMAT,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Protocol::Hub => "hub",
            Protocol::Sport => "sport",
            Protocol::Passthrough => "passthrough",
        };
        f.write_str(name)
    }
}

/// Framing rules of one wire variant
///
/// None of the variants has a trailing stop byte: the next frame's start
/// delimiter closes the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    /// Raw bytes emitted unescaped at frame start
    pub header: &'static [u8],
    /// Reserved delimiter that must never appear inside a frame body
    pub delimiter: u8,
    /// Escape byte
    pub escape: u8,
    /// XOR mask applied to an escaped byte
    pub escape_mask: u8,
    /// Whether the frame carries a checksum trailer
    pub checksum: bool,
}

impl FrameFormat {
    /// Unescaped body length: id + u16 for the hub, opcode + id + u32 + crc for S.Port
    pub const fn body_len(&self) -> usize {
        if self.checksum {
            1 + 2 + 4 + 1
        } else {
            1 + 2
        }
    }

    /// Worst case on-wire length, every body byte escaped
    pub const fn max_frame_len(&self) -> usize {
        self.header.len() + 2 * self.body_len()
    }

    /// Whether `byte` has to be escaped in a frame body
    pub fn is_reserved(&self, byte: u8) -> bool {
        byte == self.delimiter || byte == self.escape
    }
}

pub const HUB_FORMAT: FrameFormat = FrameFormat {
    header: &[HUB_START_STOP],
    delimiter: HUB_START_STOP,
    escape: HUB_BYTESTUFF,
    escape_mask: HUB_ESCAPE_MASK,
    checksum: false,
};

/// Replies to a poll: the receiver's `0x7E <id>` already delimits the frame
pub const SPORT_POLLED_FORMAT: FrameFormat = FrameFormat {
    header: &[],
    delimiter: SPORT_START_STOP,
    escape: SPORT_BYTESTUFF,
    escape_mask: SPORT_ESCAPE_MASK,
    checksum: true,
};

pub const SPORT_PUSH_FORMAT: FrameFormat = FrameFormat {
    header: &[SPORT_START_STOP, sensor_id::PASSTHROUGH],
    delimiter: SPORT_START_STOP,
    escape: SPORT_BYTESTUFF,
    escape_mask: SPORT_ESCAPE_MASK,
    checksum: true,
};
