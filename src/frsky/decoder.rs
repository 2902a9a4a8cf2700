//! # FrSky Frame Checker
//!
//! Reverses the codec: strips the header, undoes byte-stuffing and verifies
//! the checksum. The encoder never acts on inbound data; this exists so the
//! framed output can be verified, and so captured link traffic can be split
//! back into data items when debugging a receiver.

use super::crc::sport_crc_valid;
use super::protocol::{FrameFormat, SPORT_DATA_FRAME};
use crate::error::{Result, TelemetryError};

/// Undo byte-stuffing of a frame body
///
/// # Errors
///
/// Returns error if the body contains a raw delimiter, or ends on a dangling escape byte
pub fn unstuff(format: &FrameFormat, bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter();

    while let Some(&byte) = iter.next() {
        if byte == format.delimiter {
            return Err(TelemetryError::Frame(format!(
                "Unexpected delimiter 0x{:02X} inside frame",
                byte
            )));
        }
        if byte == format.escape {
            let Some(&next) = iter.next() else {
                return Err(TelemetryError::Frame("Dangling escape byte".to_string()));
            };
            out.push(next ^ format.escape_mask);
        } else {
            out.push(byte);
        }
    }

    Ok(out)
}

/// Strip the header, unescape and verify the checksum of one frame
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Unescaped body without checksum trailer
///
/// # Errors
///
/// Returns error if:
/// - Header does not match
/// - Escaping is malformed
/// - Body length is wrong
/// - Checksum check fails
pub fn decode_frame(format: &FrameFormat, frame: &[u8]) -> Result<Vec<u8>> {
    let Some(rest) = frame.strip_prefix(format.header) else {
        return Err(TelemetryError::Frame(format!(
            "Invalid header: {:02X?}",
            &frame[..frame.len().min(format.header.len())]
        )));
    };

    let mut body = unstuff(format, rest)?;

    if body.len() != format.body_len() {
        return Err(TelemetryError::Frame(format!(
            "Frame body length {} (expected {})",
            body.len(),
            format.body_len()
        )));
    }

    if format.checksum {
        if !sport_crc_valid(&body) {
            return Err(TelemetryError::Frame("Checksum mismatch".to_string()));
        }
        body.pop();
    }

    Ok(body)
}

/// Decode a hub frame into `(data id, value)`
pub fn decode_hub_frame(format: &FrameFormat, frame: &[u8]) -> Result<(u8, u16)> {
    let body = decode_frame(format, frame)?;
    Ok((body[0], u16::from_le_bytes([body[1], body[2]])))
}

/// Decode an S.Port frame into `(data id, value)`
pub fn decode_sport_frame(format: &FrameFormat, frame: &[u8]) -> Result<(u16, u32)> {
    let body = decode_frame(format, frame)?;
    if body[0] != SPORT_DATA_FRAME {
        return Err(TelemetryError::Frame(format!(
            "Unsupported frame opcode 0x{:02X}",
            body[0]
        )));
    }
    let id = u16::from_le_bytes([body[1], body[2]]);
    let value = u32::from_le_bytes([body[3], body[4], body[5], body[6]]);
    Ok((id, value))
}

/// Split a captured byte stream into frames at each header occurrence
///
/// Bytes before the first header are skipped, which is also how a receiver
/// resynchronizes after a dropped byte. Only meaningful for formats with a
/// non-empty header.
pub fn split_frames<'a>(format: &FrameFormat, stream: &'a [u8]) -> Vec<&'a [u8]> {
    let header = format.header;
    if header.is_empty() {
        return vec![stream];
    }

    let starts: Vec<usize> = (0..stream.len())
        .filter(|&i| stream[i..].starts_with(header))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(stream.len());
            &stream[start..end]
        })
        .collect()
}
