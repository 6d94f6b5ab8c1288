//! # Alecto WS1600 Codec
//!
//! Self-describing frames made of 2-byte data sets ("quartets"):
//!
//! ```text
//! a 5a 5 0 628 1 033 2 000 3 e00 4 000 bd
//! ```
//!
//! - nibble 0: start, always `0xA`
//! - next 6 bits: station ID; then a sync-phase bit and an error bit
//! - next nibble: number of data sets `n`
//! - `n` data sets, each a type nibble followed by three data nibbles:
//!   - 0: temperature, BCD tenths of °C plus 400
//!   - 1: humidity, last two nibbles BCD %
//!   - 2: rain, 12-bit counter of contact closures
//!   - 3: wind, direction nibble (22.5° steps) and speed byte in m/s
//!   - 4: gust, 12-bit speed in m/s
//! - trailing checksum byte; all `2 * n + 3` bytes sum to zero
//!
//! During the first hours after power-up all five data sets are sent,
//! afterwards only the ones that changed.

use super::{bcd3, padded, temperature_in_range, COMPASS, MAX_FRAME_LENGTH};
use crate::checksum::Checksum;

/// Start nibble
pub const HEADER: u8 = 0xA;

/// Data set kinds, by type nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSet {
    Temperature,
    Humidity,
    Rain,
    Wind,
    Gust,
    Unknown(u8),
}

impl DataSet {
    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => DataSet::Temperature,
            1 => DataSet::Humidity,
            2 => DataSet::Rain,
            3 => DataSet::Wind,
            4 => DataSet::Gust,
            other => DataSet::Unknown(other),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataSet::Temperature => "Temp",
            DataSet::Humidity => "Hum",
            DataSet::Rain => "Rain",
            DataSet::Wind => "Wind",
            DataSet::Gust => "Gust",
            DataSet::Unknown(_) => "Unknown",
        }
    }
}

/// Decoded WS1600 frame
///
/// Measurements not carried by the frame stay `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ws1600Frame {
    pub header: u8,
    pub id: u8,
    /// Station is in its acquisition phase and sends every data set
    pub syncing: bool,
    /// Station reports a sensor error (e.g. no wind sensor)
    pub sensor_error: bool,
    /// Number of data sets announced by the frame
    pub data_sets: u8,
    /// Data set kinds in transmission order
    pub kinds: Vec<DataSet>,
    /// °C
    pub temperature: Option<f32>,
    /// %
    pub humidity: Option<u8>,
    /// Rain gauge counter
    pub rain: Option<u16>,
    /// m/s
    pub wind_speed: Option<u8>,
    /// Compass index 0..16, 22.5° steps
    pub wind_direction: Option<u8>,
    /// m/s
    pub wind_gust: Option<u16>,
    /// Frame length in bytes, `2 * data_sets + 3`
    pub length: usize,
    pub crc: u8,
    pub is_valid: bool,
}

impl Ws1600Frame {
    /// Compass point of the wind direction, if a wind data set was received
    pub fn wind_bearing(&self) -> Option<&'static str> {
        self.wind_direction.map(|d| COMPASS[usize::from(d & 0x0F)])
    }
}

/// Start nibble is 0xA
pub fn matches_header(bytes: &[u8]) -> bool {
    bytes.first().map_or(false, |b| b >> 4 == HEADER)
}

/// Length announced by the data-set count nibble of byte 1
pub fn frame_length(prefix: &[u8]) -> Option<usize> {
    prefix.get(1).map(|b| usize::from(b & 0x0F) * 2 + 3)
}

/// All bytes of the announced length sum to zero
pub fn checksum_ok(bytes: &[u8]) -> bool {
    match frame_length(bytes) {
        Some(length) => Checksum::Additive.is_valid(bytes, length),
        None => false,
    }
}

/// Decode a WS1600 frame
pub fn decode(bytes: &[u8]) -> Ws1600Frame {
    let b: [u8; MAX_FRAME_LENGTH] = padded(bytes);

    let data_sets = b[1] & 0x0F;
    let length = usize::from(data_sets) * 2 + 3;

    let mut frame = Ws1600Frame {
        header: b[0] >> 4,
        id: ((b[0] & 0x0F) << 2) | (b[1] >> 6),
        syncing: b[1] & 0x20 != 0,
        sensor_error: b[1] & 0x10 != 0,
        data_sets,
        length,
        crc: b[length - 1],
        ..Default::default()
    };

    for i in 0..usize::from(data_sets) {
        let hi = b[2 + i * 2];
        let lo = b[3 + i * 2];
        let kind = DataSet::from_tag(hi >> 4);

        match kind {
            DataSet::Temperature => {
                let tenths = bcd3(hi & 0x0F, lo >> 4, lo & 0x0F);
                frame.temperature = Some((f32::from(tenths) - 400.0) / 10.0);
            }
            DataSet::Humidity => {
                frame.humidity = Some((lo >> 4) * 10 + (lo & 0x0F));
            }
            DataSet::Rain => {
                frame.rain = Some((u16::from(hi & 0x0F) << 8) | u16::from(lo));
            }
            DataSet::Wind => {
                frame.wind_direction = Some(hi & 0x0F);
                frame.wind_speed = Some(lo);
            }
            DataSet::Gust => {
                frame.wind_gust = Some((u16::from(hi & 0x0F) << 8) | u16::from(lo));
            }
            DataSet::Unknown(_) => {}
        }

        frame.kinds.push(kind);
    }

    frame.is_valid = matches_header(&b) && checksum_ok(&b) && is_plausible(&frame);
    frame
}

/// Temperature, when present, from -40 up to, not including, 60 °C
pub fn is_plausible(frame: &Ws1600Frame) -> bool {
    frame.temperature.map_or(true, temperature_in_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::sum8;

    /// Append the byte that makes the frame sum to zero
    fn with_checksum(mut bytes: Vec<u8>) -> Vec<u8> {
        let sum = sum8(&bytes);
        bytes.push(0u8.wrapping_sub(sum));
        bytes
    }

    #[test]
    fn test_two_data_sets_temperature_and_humidity() {
        // a 5a 2 0 628 1 033
        let bytes = with_checksum(vec![0xA5, 0xA2, 0x06, 0x28, 0x10, 0x33]);
        assert_eq!(frame_length(&bytes), Some(7));

        let frame = decode(&bytes);
        assert!(frame.is_valid);
        assert_eq!(frame.length, 7);
        assert_eq!(frame.id, 22);
        assert_eq!(frame.data_sets, 2);
        assert!((frame.temperature.unwrap() - 22.8).abs() < 0.001);
        assert_eq!(frame.humidity, Some(33));
        assert_eq!(frame.wind_speed, None);
        assert_eq!(frame.rain, None);
        assert_eq!(frame.kinds, vec![DataSet::Temperature, DataSet::Humidity]);
    }

    #[test]
    fn test_all_five_data_sets() {
        // a 5a 5 0 628 1 033 2 000 3 e00 4 000
        let bytes = with_checksum(vec![
            0xA5, 0xA5, 0x06, 0x28, 0x10, 0x33, 0x20, 0x00, 0x3E, 0x07, 0x40, 0x0C,
        ]);

        let frame = decode(&bytes);
        assert!(frame.is_valid);
        assert_eq!(frame.length, 13);
        assert!(frame.syncing);
        assert!(!frame.sensor_error);
        assert_eq!(frame.rain, Some(0));
        assert_eq!(frame.wind_direction, Some(0xE));
        assert_eq!(frame.wind_bearing(), Some("NW"));
        assert_eq!(frame.wind_speed, Some(7));
        assert_eq!(frame.wind_gust, Some(12));
    }

    #[test]
    fn test_error_flag() {
        let bytes = with_checksum(vec![0xA5, 0xB1, 0x10, 0x45]);
        let frame = decode(&bytes);
        assert!(frame.is_valid);
        assert!(frame.sensor_error);
        assert_eq!(frame.humidity, Some(45));
        assert_eq!(frame.temperature, None);
    }

    #[test]
    fn test_checksum_over_declared_length_only() {
        let mut bytes = with_checksum(vec![0xA5, 0xA1, 0x10, 0x45]);
        bytes.extend_from_slice(&[0xDE, 0xAD]);
        assert!(decode(&bytes).is_valid);

        bytes[3] ^= 0x01;
        assert!(!decode(&bytes).is_valid);
    }

    #[test]
    fn test_negative_temperature() {
        // 0 345 -> 34.5 - 40.0 = -5.5 °C
        let bytes = with_checksum(vec![0xA5, 0xA1, 0x03, 0x45]);
        let frame = decode(&bytes);
        assert!(frame.is_valid);
        assert!((frame.temperature.unwrap() + 5.5).abs() < 0.001);
    }

    #[test]
    fn test_implausible_temperature_is_invalid() {
        // 0 A00 -> 60.0 rejected, 0 000 -> -40.0 accepted
        let bytes = with_checksum(vec![0xA5, 0xA1, 0x0A, 0x00]);
        assert!(checksum_ok(&bytes));
        assert!(!decode(&bytes).is_valid);

        let bytes = with_checksum(vec![0xA5, 0xA1, 0x00, 0x00]);
        let frame = decode(&bytes);
        assert_eq!(frame.temperature, Some(-40.0));
        assert!(frame.is_valid);
    }

    #[test]
    fn test_unknown_data_set_is_recorded() {
        let bytes = with_checksum(vec![0xA5, 0xA1, 0x71, 0x23]);
        let frame = decode(&bytes);
        assert!(frame.is_valid);
        assert_eq!(frame.kinds, vec![DataSet::Unknown(7)]);
    }

    #[test]
    fn test_frame_length_needs_two_bytes() {
        assert_eq!(frame_length(&[0xA5]), None);
        assert!(!checksum_ok(&[0xA5]));
        assert_eq!(frame_length(&[0xA5, 0x0F]), Some(33));
    }
}
