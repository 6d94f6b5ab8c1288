//! # Fine Offset WH1080 / Alecto WS4000 Codec
//!
//! Weather readings are sent six times back to back, every 48 seconds.
//!
//! ```text
//! AAAABBBBBBBBCCCCCCCCCCCCDDDDDDDDEEEEEEEEFFFFFFFFGGGGHHHHHHHHHHHHIIIIJJJJKKKKKKKK
//! ```
//!
//! - `A` message type, `0xA` for sensor readings
//! - `B` station ID (rolling code, changes on battery insertion)
//! - `C` temperature * 10, sign and magnitude (bit 11 is the sign)
//! - `D` humidity, bit 7 unused
//! - `E` wind speed, `F` wind gust, both in 0.34 m/s steps
//! - `G` unknown
//! - `H` cumulative rain counter, 0.3 mm steps
//! - `I` status bits, `J` wind direction as compass index
//! - `K` CRC-8 (0x31) over bytes 0..9

use super::{padded, temperature_in_range, COMPASS};
use crate::checksum::crc8;

/// WH1080 frame length in bytes
pub const FRAME_LENGTH: usize = 10;

/// Message type nibble of weather readings
pub const HEADER: u8 = 0xA;

/// Wind speed and gust scaling, m/s per count
const WIND_SCALE: f32 = 0.34;

/// Rain scaling, mm per count
const RAIN_SCALE: f32 = 0.3;

/// Decoded WH1080 weather frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wh1080Frame {
    pub header: u8,
    pub id: u8,
    /// °C
    pub temperature: f32,
    /// %
    pub humidity: u8,
    /// m/s
    pub wind_speed: f32,
    /// m/s
    pub wind_gust: f32,
    pub unknown: u8,
    /// mm, cumulative
    pub rain: f32,
    pub status: u8,
    /// Compass index 0..16, see [`Wh1080Frame::wind_bearing`]
    pub wind_direction: u8,
    pub crc: u8,
    pub is_valid: bool,
}

impl Wh1080Frame {
    /// Compass point of the wind direction
    pub fn wind_bearing(&self) -> &'static str {
        COMPASS[usize::from(self.wind_direction & 0x0F)]
    }

    /// Status bit 3 flags a low battery
    pub fn low_battery(&self) -> bool {
        self.status & 0x08 != 0
    }
}

/// Message type nibble is 0xA
pub fn matches_header(bytes: &[u8]) -> bool {
    bytes.first().map_or(false, |b| b >> 4 == HEADER)
}

/// CRC-8 over the first nine bytes matches byte 9
pub fn checksum_ok(bytes: &[u8]) -> bool {
    bytes.len() >= FRAME_LENGTH && bytes[9] == crc8(&bytes[..9])
}

/// Sign-and-magnitude temperature in tenths of a degree
fn temperature_tenths(b1: u8, b2: u8) -> i16 {
    let magnitude = (i16::from(b1 & 0x07) << 8) | i16::from(b2);
    if b1 & 0x08 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a WH1080 weather frame
pub fn decode(bytes: &[u8]) -> Wh1080Frame {
    let b: [u8; FRAME_LENGTH] = padded(bytes);

    let rain_counts = (u16::from(b[6] & 0x0F) << 8) | u16::from(b[7]);

    let mut frame = Wh1080Frame {
        header: b[0] >> 4,
        id: (b[0] << 4) | (b[1] >> 4),
        temperature: f32::from(temperature_tenths(b[1], b[2])) / 10.0,
        humidity: b[3] & 0x7F,
        wind_speed: f32::from(b[4]) * WIND_SCALE,
        wind_gust: f32::from(b[5]) * WIND_SCALE,
        unknown: b[6] >> 4,
        rain: f32::from(rain_counts) * RAIN_SCALE,
        status: b[8] >> 4,
        wind_direction: b[8] & 0x0F,
        crc: b[9],
        is_valid: false,
    };

    frame.is_valid = matches_header(&b) && checksum_ok(&b) && is_plausible(&frame);
    frame
}

/// Temperature from -40 up to, not including, 60 °C
pub fn is_plausible(frame: &Wh1080Frame) -> bool {
    temperature_in_range(frame.temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_crc(mut bytes: [u8; FRAME_LENGTH]) -> [u8; FRAME_LENGTH] {
        bytes[9] = crc8(&bytes[..9]);
        bytes
    }

    #[test]
    fn test_all_zero_frame_with_header() {
        let bytes = with_crc([0xA0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let frame = decode(&bytes);

        assert!(frame.is_valid);
        assert_eq!(frame.temperature, 0.0);
        assert_eq!(frame.humidity, 0);
        assert_eq!(frame.wind_bearing(), "N");
    }

    #[test]
    fn test_decode_reference_frame() {
        // Station 0x4F, 3.9 °C, 71 %
        let bytes = with_crc([0xA4, 0xF0, 0x27, 0x47, 0x00, 0x00, 0x03, 0xC6, 0x0C, 0x00]);
        let frame = decode(&bytes);

        assert!(frame.is_valid);
        assert_eq!(frame.id, 0x4F);
        assert!((frame.temperature - 3.9).abs() < 0.001);
        assert_eq!(frame.humidity, 71);
        assert!((frame.rain - 0x3C6 as f32 * 0.3).abs() < 0.001);
        assert_eq!(frame.status, 0);
        assert_eq!(frame.wind_direction, 0xC);
        assert_eq!(frame.wind_bearing(), "W");
    }

    #[test]
    fn test_negative_temperature_is_sign_magnitude() {
        // Sign bit set, magnitude 0x05A = 90 -> -9.0 °C
        let bytes = with_crc([0xA1, 0x28, 0x5A, 0x50, 0, 0, 0, 0, 0, 0]);
        let frame = decode(&bytes);

        assert!(frame.is_valid);
        assert!((frame.temperature + 9.0).abs() < 0.001);
    }

    #[test]
    fn test_wind_and_gust_scaling() {
        let bytes = with_crc([0xA1, 0x20, 0xC8, 0x50, 10, 25, 0x70, 0, 0x8F, 0]);
        let frame = decode(&bytes);

        assert!((frame.wind_speed - 3.4).abs() < 0.001);
        assert!((frame.wind_gust - 8.5).abs() < 0.001);
        assert_eq!(frame.unknown, 0x7);
        assert!(frame.low_battery());
        assert_eq!(frame.wind_bearing(), "NNW");
    }

    #[test]
    fn test_crc_mismatch_is_invalid() {
        let mut bytes = with_crc([0xA1, 0x20, 0xC8, 0x50, 0, 0, 0, 0, 0, 0]);
        bytes[9] ^= 0x80;
        assert!(!decode(&bytes).is_valid);
    }

    #[test]
    fn test_implausible_temperature_is_invalid() {
        // Magnitude 0x3E8 = 1000 -> 100.0 °C
        let bytes = with_crc([0xA1, 0x23, 0xE8, 0x50, 0, 0, 0, 0, 0, 0]);
        assert!(checksum_ok(&bytes));
        assert!(!decode(&bytes).is_valid);
    }

    #[test]
    fn test_time_message_is_not_weather() {
        let bytes = with_crc([0xB4, 0xFA, 0x59, 0x06, 0x42, 0x13, 0x43, 0x02, 0x45, 0]);
        assert!(!matches_header(&bytes));
        assert!(!decode(&bytes).is_valid);
    }
}
