//! # Technoline TX38-IT Codec
//!
//! ```text
//! .- [0] -. .- [1] -. .- [2] -. .- [3] -.
//! SSDD.DDDD NWTT.TTTT TTTT.CCCC CCCC.MMMM
//! ```
//!
//! - `S` start bits, always `11`
//! - `D` 6-bit sensor ID
//! - `N` new battery, `W` weak battery
//! - `T` 10-bit temperature, `T * 0.1 - 40`
//! - `C` CRC-8 (0x31) over the first 20 bits only
//! - `M` miscellaneous bits, passed through

use super::{from_offset_tenths, offset_tenths, padded, temperature_in_range};
use crate::checksum::crc8_bits;

/// TX38IT frame length in bytes
pub const FRAME_LENGTH: usize = 4;

/// Number of leading bits covered by the CRC
pub const CRC_BITS: usize = 20;

/// Value of the two start bits
pub const HEADER: u8 = 0b11;

/// Humidity reported for this temperature-only sensor
pub const NO_HUMIDITY: u8 = 106;

/// Decoded TX38IT frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tx38ItFrame {
    pub header: u8,
    pub id: u8,
    pub new_battery: bool,
    pub weak_battery: bool,
    pub temperature: f32,
    /// Always [`NO_HUMIDITY`]
    pub humidity: u8,
    pub misc_bits: u8,
    pub crc: u8,
    pub is_valid: bool,
}

impl Tx38ItFrame {
    /// Frame for transmission; header and CRC are filled in by [`encode`]
    pub fn new(id: u8, temperature: f32) -> Self {
        Self {
            header: HEADER,
            id,
            new_battery: false,
            weak_battery: false,
            temperature,
            humidity: NO_HUMIDITY,
            misc_bits: 0,
            crc: 0,
            is_valid: true,
        }
    }
}

/// Top two bits are set
pub fn matches_header(bytes: &[u8]) -> bool {
    bytes.first().map_or(false, |b| b & 0xC0 == 0xC0)
}

/// CRC split across byte 2 low nibble and byte 3 high nibble
fn stored_crc(b: &[u8]) -> u8 {
    ((b[2] & 0x0F) << 4) | (b[3] >> 4)
}

/// Truncated 20-bit CRC matches the stored CRC
pub fn checksum_ok(bytes: &[u8]) -> bool {
    bytes.len() >= FRAME_LENGTH && stored_crc(bytes) == crc8_bits(bytes, CRC_BITS)
}

/// Decode a TX38IT frame
pub fn decode(bytes: &[u8]) -> Tx38ItFrame {
    let b: [u8; FRAME_LENGTH] = padded(bytes);

    let tenths = (u16::from(b[1] & 0x3F) << 4) | u16::from(b[2] >> 4);

    let mut frame = Tx38ItFrame {
        header: b[0] >> 6,
        id: b[0] & 0x3F,
        new_battery: b[1] & 0x80 != 0,
        weak_battery: b[1] & 0x40 != 0,
        temperature: from_offset_tenths(tenths),
        humidity: NO_HUMIDITY,
        misc_bits: b[3] & 0x0F,
        crc: stored_crc(&b),
        is_valid: false,
    };

    frame.is_valid = matches_header(&b) && checksum_ok(&b) && is_plausible(&frame);
    frame
}

/// Encode a TX38IT frame, computing the truncated CRC
pub fn encode(frame: &Tx38ItFrame) -> [u8; FRAME_LENGTH] {
    let mut bytes = [0u8; FRAME_LENGTH];
    let tenths = offset_tenths(frame.temperature).min(0x3FF);

    bytes[0] = (HEADER << 6) | (frame.id & 0x3F);
    bytes[1] = u8::from(frame.new_battery) << 7;
    bytes[1] |= u8::from(frame.weak_battery) << 6;
    bytes[1] |= ((tenths >> 4) & 0x3F) as u8;
    bytes[2] = ((tenths << 4) & 0xF0) as u8;

    let crc = crc8_bits(&bytes, CRC_BITS);
    bytes[2] |= crc >> 4;
    bytes[3] = (crc << 4) | (frame.misc_bits & 0x0F);

    bytes
}

/// Temperature from -40 up to, not including, 60 °C
pub fn is_plausible(frame: &Tx38ItFrame) -> bool {
    temperature_in_range(frame.temperature)
}
