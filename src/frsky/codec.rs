//! # FrSky Frame Codec
//!
//! Byte-level framing shared by every protocol variant: start header,
//! byte-stuffing of reserved bytes, checksum accumulation and trailer.
//!
//! A codec builds one frame at a time into an internal buffer; the driver
//! hands the finished frame to the transport in one write so that a frame
//! is either sent whole or not at all.

use bytes::{BufMut, Bytes, BytesMut};

use super::crc::SportCrc;
use super::protocol::{FrameFormat, SPORT_DATA_FRAME};

/// Frame builder for one wire variant
#[derive(Debug, Clone)]
pub struct FrameCodec {
    format: FrameFormat,
    buf: BytesMut,
    crc: SportCrc,
}

impl FrameCodec {
    #[must_use]
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format,
            buf: BytesMut::with_capacity(format.max_frame_len()),
            crc: SportCrc::new(),
        }
    }

    pub fn format(&self) -> &FrameFormat {
        &self.format
    }

    /// Reset the checksum and emit the start header
    pub fn begin_frame(&mut self) {
        self.buf.clear();
        self.crc.reset();
        self.buf.extend_from_slice(self.format.header);
    }

    /// Emit one body byte, escaping it if reserved
    ///
    /// The checksum always folds the original (unescaped) byte.
    pub fn send_byte(&mut self, byte: u8) {
        if self.format.checksum {
            self.crc.update(byte);
        }
        if self.format.is_reserved(byte) {
            self.buf.put_u8(self.format.escape);
            self.buf.put_u8(byte ^ self.format.escape_mask);
        } else {
            self.buf.put_u8(byte);
        }
    }

    /// Emit a hub data item: `id lo hi`
    pub fn send_word16(&mut self, id: u8, value: u16) {
        self.send_byte(id);
        for byte in value.to_le_bytes() {
            self.send_byte(byte);
        }
    }

    /// Emit an S.Port data item: `0x10 id_lo id_hi d0 d1 d2 d3`
    pub fn send_word32(&mut self, id: u16, value: u32) {
        self.send_byte(SPORT_DATA_FRAME);
        for byte in id.to_le_bytes() {
            self.send_byte(byte);
        }
        for byte in value.to_le_bytes() {
            self.send_byte(byte);
        }
    }

    /// Emit the checksum trailer (if the format has one) and hand out the frame
    pub fn end_frame(&mut self) -> Bytes {
        if self.format.checksum {
            let trailer = self.crc.trailer();
            self.send_byte(trailer);
        }
        self.buf.split().freeze()
    }

    /// Build a complete hub frame
    pub fn frame_word16(&mut self, id: u8, value: u16) -> Bytes {
        self.begin_frame();
        self.send_word16(id, value);
        self.end_frame()
    }

    /// Build a complete S.Port frame
    pub fn frame_word32(&mut self, id: u16, value: u32) -> Bytes {
        self.begin_frame();
        self.send_word32(id, value);
        self.end_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frsky::crc::sport_crc;
    use crate::frsky::protocol::*;

    #[test]
    fn test_hub_frame_structure() {
        let mut codec = FrameCodec::new(HUB_FORMAT);
        let frame = codec.frame_word16(hub_id::VFAS, 0x0102);
        assert_eq!(&frame[..], &[0x5E, 0x39, 0x02, 0x01]);
    }

    #[test]
    fn test_hub_escapes_delimiter_and_escape() {
        let mut codec = FrameCodec::new(HUB_FORMAT);
        let frame = codec.frame_word16(hub_id::FUEL, 0x5D5E);
        assert_eq!(&frame[..], &[0x5E, 0x04, 0x5D, 0x3E, 0x5D, 0x3D]);
    }

    #[test]
    fn test_sport_polled_frame_structure() {
        let mut codec = FrameCodec::new(SPORT_POLLED_FORMAT);
        let frame = codec.frame_word32(data_id::VFAS_FIRST, 0x0000_04B0);

        let body = [0x10, 0x10, 0x02, 0xB0, 0x04, 0x00, 0x00];
        let mut expected = body.to_vec();
        expected.push(sport_crc(&body));
        assert_eq!(&frame[..], &expected[..]);
    }

    #[test]
    fn test_sport_push_frame_has_header() {
        let mut codec = FrameCodec::new(SPORT_PUSH_FORMAT);
        let frame = codec.frame_word32(data_id::DIY_FIRST + 3, 0);
        assert_eq!(&frame[..2], &[0x7E, 0x1B]);
        assert_eq!(frame[2], SPORT_DATA_FRAME);
        assert_eq!(frame.len(), 10);
    }

    #[test]
    fn test_sport_escapes_payload() {
        let mut codec = FrameCodec::new(SPORT_POLLED_FORMAT);
        let frame = codec.frame_word32(0x5000, 0x0000_7D7E);
        // 0x7E -> 7D 5E, 0x7D -> 7D 5D
        assert_eq!(&frame[3..7], &[0x7D, 0x5E, 0x7D, 0x5D]);
        assert!(!frame[..].contains(&SPORT_START_STOP));
    }

    #[test]
    fn test_checksum_folds_unescaped_bytes() {
        let mut codec = FrameCodec::new(SPORT_POLLED_FORMAT);
        let frame = codec.frame_word32(0x5000, 0x0000_007E);
        let body = [0x10, 0x00, 0x50, 0x7E, 0x00, 0x00, 0x00];
        assert_eq!(*frame.last().unwrap(), sport_crc(&body));
    }

    #[test]
    fn test_frames_are_independent() {
        let mut codec = FrameCodec::new(SPORT_POLLED_FORMAT);
        let first = codec.frame_word32(0x5001, 0xDEAD_BEEF);
        let _ = codec.frame_word32(0x5002, 0x1234_5678);
        let again = codec.frame_word32(0x5001, 0xDEAD_BEEF);
        assert_eq!(first, again);
    }

    #[test]
    fn test_frame_never_exceeds_max_len() {
        let mut codec = FrameCodec::new(SPORT_PUSH_FORMAT);
        let frame = codec.frame_word32(0x7E7D, 0x7E7D_7E7D);
        assert!(frame.len() <= SPORT_PUSH_FORMAT.max_frame_len());
    }
}
