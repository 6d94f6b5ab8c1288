//! # LaCrosse IT+ Codec
//!
//! ```text
//! .- [0] -. .- [1] -. .- [2] -. .- [3] -. .- [4] -.
//! SSSS.DDDD DDNB.TTTT TTTT.TTTT WHHH.HHHH CCCC.CCCC
//! ```
//!
//! - `S` start nibble, always 9
//! - `D` 6-bit sensor ID
//! - `N` new battery flag, `B` bit 12 (unused by the sensors)
//! - `T` temperature as three BCD digits of `(T + 40) * 10`
//! - `W` weak battery flag, `H` 7-bit relative humidity
//! - `C` CRC-8 (0x31) over bytes 0..4

use super::{bcd3, digits3, from_offset_tenths, offset_tenths, padded, temperature_in_range};
use crate::checksum::crc8;

/// LaCrosse frame length in bytes
pub const FRAME_LENGTH: usize = 5;

/// Start nibble of every LaCrosse frame
pub const HEADER: u8 = 9;

/// Decoded LaCrosse IT+ frame
///
/// Also carries WT440XH readings, which map onto the same fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaCrosseFrame {
    /// Start nibble (9), or the full first byte for WT440XH
    pub header: u8,

    /// Sensor ID
    pub id: u8,

    /// Set for a few hours after a battery change
    pub new_battery: bool,

    /// Unused status bit
    pub bit12: bool,

    /// Temperature in °C
    pub temperature: f32,

    /// Battery low indicator
    pub weak_battery: bool,

    /// Relative humidity in %, 106 means "no humidity sensor"
    pub humidity: u8,

    /// Received CRC byte
    pub crc: u8,

    /// Header, CRC and plausibility all passed
    pub is_valid: bool,
}

impl LaCrosseFrame {
    /// Frame for transmission; header and CRC are filled in by [`encode`]
    pub fn new(id: u8, temperature: f32, humidity: u8) -> Self {
        Self {
            header: HEADER,
            id,
            new_battery: false,
            bit12: false,
            temperature,
            weak_battery: false,
            humidity,
            crc: 0,
            is_valid: true,
        }
    }
}

/// Start nibble is 9
pub fn matches_header(bytes: &[u8]) -> bool {
    bytes.first().map_or(false, |b| b >> 4 == HEADER)
}

/// CRC-8 over the first four bytes matches byte 4
pub fn checksum_ok(bytes: &[u8]) -> bool {
    bytes.len() >= FRAME_LENGTH && bytes[4] == crc8(&bytes[..4])
}

/// Decode a LaCrosse frame
pub fn decode(bytes: &[u8]) -> LaCrosseFrame {
    let b: [u8; FRAME_LENGTH] = padded(bytes);

    let tenths = bcd3(b[1] & 0x0F, b[2] >> 4, b[2] & 0x0F);

    let mut frame = LaCrosseFrame {
        header: b[0] >> 4,
        id: ((b[0] & 0x0F) << 2) | (b[1] >> 6),
        new_battery: b[1] & 0x20 != 0,
        bit12: b[1] & 0x10 != 0,
        temperature: from_offset_tenths(tenths),
        weak_battery: b[3] & 0x80 != 0,
        humidity: b[3] & 0x7F,
        crc: b[4],
        is_valid: false,
    };

    frame.is_valid = matches_header(&b) && checksum_ok(&b) && is_plausible(&frame);
    frame
}

/// Encode a LaCrosse frame, computing the trailing CRC
///
/// The ID is truncated to 6 bits, the humidity to 7 bits and the
/// temperature clamped to the three-digit BCD range (-40.0 .. 59.9 °C).
pub fn encode(frame: &LaCrosseFrame) -> [u8; FRAME_LENGTH] {
    let mut bytes = [0u8; FRAME_LENGTH];
    let (hundreds, tens, ones) = digits3(offset_tenths(frame.temperature));

    bytes[0] = (HEADER << 4) | ((frame.id >> 2) & 0x0F);
    bytes[1] = (frame.id & 0x03) << 6;
    bytes[1] |= u8::from(frame.new_battery) << 5;
    bytes[1] |= u8::from(frame.bit12) << 4;
    bytes[1] |= hundreds;
    bytes[2] = (tens << 4) | ones;
    bytes[3] = (frame.humidity & 0x7F) | (u8::from(frame.weak_battery) << 7);
    bytes[4] = crc8(&bytes[..4]);

    bytes
}

/// Temperature from -40 up to, not including, 60 °C
pub fn is_plausible(frame: &LaCrosseFrame) -> bool {
    temperature_in_range(frame.temperature)
}
