//! # Level Sender Codec
//!
//! Ultrasonic tank level sender, shares the IT+ air format.
//!
//! ```text
//! .- [0] -. .- [1] -. .- [2] -. .- [3] -. .- [4] -. .- [5] -.
//! SSSS.DDDD LLLL.LLLL LLLL.TTTT TTTT.TTTT VVVV.VVVV CCCC.CCCC
//! ```
//!
//! - `S` start nibble, always 11
//! - `D` sensor ID (0..15)
//! - `L` level as three BCD digits of 0.5 cm steps
//! - `T` temperature as BCD tens, ones and tenths of `T + 40`
//! - `V` battery voltage, whole volts and tenths
//! - `C` CRC-8 (0x31) over bytes 0..5

use super::{bcd3, digits3, from_offset_tenths, offset_tenths, padded};
use crate::checksum::crc8;

/// Level sender frame length in bytes
pub const FRAME_LENGTH: usize = 6;

/// Start nibble
pub const HEADER: u8 = 11;

/// Centimetres per level step
const LEVEL_STEP: f32 = 0.5;

/// Decoded level sender frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSenderFrame {
    pub header: u8,
    pub id: u8,
    /// cm
    pub level: f32,
    /// °C
    pub temperature: f32,
    /// V
    pub voltage: f32,
    pub crc: u8,
    pub is_valid: bool,
}

impl LevelSenderFrame {
    /// Frame for transmission; the CRC is filled in by [`encode`]
    pub fn new(id: u8, level: f32, temperature: f32, voltage: f32) -> Self {
        Self {
            header: HEADER,
            id,
            level,
            temperature,
            voltage,
            crc: 0,
            is_valid: true,
        }
    }
}

/// Start nibble is 11
pub fn matches_header(bytes: &[u8]) -> bool {
    bytes.first().map_or(false, |b| b >> 4 == HEADER)
}

/// CRC-8 over the first five bytes matches byte 5
pub fn checksum_ok(bytes: &[u8]) -> bool {
    bytes.len() >= FRAME_LENGTH && bytes[5] == crc8(&bytes[..5])
}

/// Decode a level sender frame
pub fn decode(bytes: &[u8]) -> LevelSenderFrame {
    let b: [u8; FRAME_LENGTH] = padded(bytes);

    let steps = bcd3(b[1] >> 4, b[1] & 0x0F, b[2] >> 4);
    let tenths = bcd3(b[2] & 0x0F, b[3] >> 4, b[3] & 0x0F);
    let volt_tenths = (b[4] >> 4) * 10 + (b[4] & 0x0F);

    let mut frame = LevelSenderFrame {
        header: b[0] >> 4,
        id: b[0] & 0x0F,
        level: f32::from(steps) * LEVEL_STEP,
        temperature: from_offset_tenths(tenths),
        voltage: f32::from(volt_tenths) / 10.0,
        crc: b[5],
        is_valid: false,
    };

    frame.is_valid = matches_header(&b) && checksum_ok(&b) && is_plausible(&frame);
    frame
}

/// Encode a level sender frame, computing the trailing CRC
pub fn encode(frame: &LevelSenderFrame) -> [u8; FRAME_LENGTH] {
    let mut bytes = [0u8; FRAME_LENGTH];

    let steps = (frame.level / LEVEL_STEP).round().max(0.0) as u16;
    let (l_hundreds, l_tens, l_ones) = digits3(steps);
    let (t_tens, t_ones, t_tenths) = digits3(offset_tenths(frame.temperature));
    let volt_tenths = (frame.voltage * 10.0).round().clamp(0.0, 159.0) as u8;

    bytes[0] = (HEADER << 4) | (frame.id & 0x0F);
    bytes[1] = (l_hundreds << 4) | l_tens;
    bytes[2] = (l_ones << 4) | t_tens;
    bytes[3] = (t_ones << 4) | t_tenths;
    bytes[4] = ((volt_tenths / 10) << 4) | (volt_tenths % 10);
    bytes[5] = crc8(&bytes[..5]);

    bytes
}

/// Temperature -40..=60 °C, level 2..=300 cm, voltage 2..=13 V
pub fn is_plausible(frame: &LevelSenderFrame) -> bool {
    (-40.0..=60.0).contains(&frame.temperature)
        && (2.0..=300.0).contains(&frame.level)
        && (2.0..=13.0).contains(&frame.voltage)
}
