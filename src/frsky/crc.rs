//! # S.Port Checksum
//!
//! FrSky S.Port frames end with a one's-complement checksum byte.
//!
//! **Algorithm**: 8-bit sum with end-around carry over the unescaped body
//! (opcode, data id, payload), transmitted as `0xFF - sum`.
//! **Initial Value**: 0x00
//!
//! Folding every body byte *and* the trailer yields `0xFF` on a good frame.

/// Value the running sum reaches when a frame (body + trailer) is intact
pub const SPORT_CRC_GOOD: u8 = 0xFF;

/// Running S.Port checksum, reset at frame start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SportCrc {
    sum: u16,
}

impl SportCrc {
    #[must_use]
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    pub fn reset(&mut self) {
        self.sum = 0;
    }

    /// Fold one unescaped byte into the sum
    pub fn update(&mut self, byte: u8) {
        self.sum += u16::from(byte);
        self.sum += self.sum >> 8;
        self.sum &= 0xFF;
    }

    /// Current folded sum
    pub fn sum(&self) -> u8 {
        self.sum as u8
    }

    /// Trailer byte for the bytes folded so far
    pub fn trailer(&self) -> u8 {
        0xFF - self.sum()
    }
}

/// Calculate the S.Port trailer byte for a frame body
///
/// # Arguments
///
/// * `data` - Unescaped body bytes (opcode + data id + payload)
///
/// # Examples
///
/// ```
/// use frsky_telem::frsky::crc::sport_crc;
///
/// let body = [0x10, 0x00, 0x50, 0x01, 0x02, 0x03, 0x04];
/// let trailer = sport_crc(&body);
/// assert_eq!(trailer, 0xFF - 0x6A);
/// ```
pub fn sport_crc(data: &[u8]) -> u8 {
    let mut crc = SportCrc::new();
    for &byte in data {
        crc.update(byte);
    }
    crc.trailer()
}

/// Check a body whose last byte is the trailer
pub fn sport_crc_valid(body_with_trailer: &[u8]) -> bool {
    let mut crc = SportCrc::new();
    for &byte in body_with_trailer {
        crc.update(byte);
    }
    crc.sum() == SPORT_CRC_GOOD
}
