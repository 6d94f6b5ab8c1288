//! # EMT7110 Energy Meter Codec
//!
//! Sent at 9579 bit/s.
//!
//! | Byte | Content |
//! |------|---------|
//! | 0, 1 | Identification `25 6A`, `25 2A` while pairing, or `25 40` |
//! | 2, 3 | Meter ID |
//! | 4 | bit 7 pairing, bit 6 consumer connected, bits 0..5 power high |
//! | 5 | Power low, 0.5 W steps |
//! | 6, 7 | Current in mA |
//! | 8 | Voltage, 0.5 V steps above 128 V |
//! | 9 | bits 6, 7 unknown, bits 0..5 energy high |
//! | 10 | Energy low, 0.01 kWh steps |
//! | 11 | Additive checksum, all twelve bytes sum to zero |

use super::padded;
use crate::checksum::Checksum;

/// EMT7110 frame length in bytes
pub const FRAME_LENGTH: usize = 12;

/// First identification byte
pub const HEADER: u8 = 0x25;

/// Accepted second identification bytes
pub const SUB_HEADERS: [u8; 3] = [0x6A, 0x2A, 0x40];

/// Decoded EMT7110 frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emt7110Frame {
    pub header: [u8; 2],
    pub id: u16,
    /// Meter is in pairing mode; no measurements are carried
    pub pairing: bool,
    /// A consumer is drawing power
    pub connected: bool,
    /// W
    pub power: f32,
    /// mA
    pub current: u16,
    /// V
    pub voltage: f32,
    /// kWh, accumulated
    pub energy: f32,
    /// Bits 6 and 7 of byte 9, meaning unknown
    pub reserved: u8,
    pub crc: u8,
    pub is_valid: bool,
}

/// Identification bytes are `0x25` followed by one of [`SUB_HEADERS`]
pub fn matches_header(bytes: &[u8]) -> bool {
    match bytes {
        [first, second, ..] => *first == HEADER && SUB_HEADERS.contains(second),
        _ => false,
    }
}

/// All twelve bytes sum to zero
pub fn checksum_ok(bytes: &[u8]) -> bool {
    Checksum::Additive.is_valid(bytes, FRAME_LENGTH)
}

/// Decode an EMT7110 frame
///
/// Pairing frames keep their ID but report zero measurements and are
/// never valid.
pub fn decode(bytes: &[u8]) -> Emt7110Frame {
    let b: [u8; FRAME_LENGTH] = padded(bytes);

    let mut frame = Emt7110Frame {
        header: [b[0], b[1]],
        id: u16::from_be_bytes([b[2], b[3]]),
        pairing: b[4] & 0x80 != 0,
        connected: false,
        power: 0.0,
        current: 0,
        voltage: 0.0,
        energy: 0.0,
        reserved: b[9] >> 6,
        crc: 0,
        is_valid: false,
    };

    if frame.pairing {
        return frame;
    }

    let power_counts = (u16::from(b[4] & 0x3F) << 8) | u16::from(b[5]);
    let energy_counts = (u16::from(b[9] & 0x3F) << 8) | u16::from(b[10]);

    frame.connected = b[4] & 0x40 != 0;
    frame.power = f32::from(power_counts) * 0.5;
    frame.current = u16::from_be_bytes([b[6], b[7]]);
    frame.voltage = 128.0 + f32::from(b[8]) * 0.5;
    frame.energy = f32::from(energy_counts) / 100.0;
    frame.crc = b[11];
    frame.is_valid = matches_header(&b) && checksum_ok(&b) && is_plausible(&frame);

    frame
}

/// Pairing frames carry no readings
pub fn is_plausible(frame: &Emt7110Frame) -> bool {
    !frame.pairing
}
