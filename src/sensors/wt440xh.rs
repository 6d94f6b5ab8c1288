//! # Hideki WT440XH Codec
//!
//! ```text
//! _Byte 0_ _Byte 1_ _Byte 2_ _Byte 3_ _Byte 4_ _Byte 5_
//! KKKKKKKK bbDDHHHH TTTTTTTT tttttttt hhhhhhhh CCCCCCCC
//! ```
//!
//! - `K` fixed start byte `0x51`
//! - `b` low battery, `D` device code (0 means 4), `H` house code
//! - `T` whole degrees offset by 50, `t` tenths
//! - `h` relative humidity
//! - `C` additive checksum, all six bytes sum to zero
//!
//! Readings are reported through the LaCrosse field set.

use super::{padded, temperature_in_range, LaCrosseFrame};
use crate::checksum::Checksum;

/// WT440XH frame length in bytes
pub const FRAME_LENGTH: usize = 6;

/// Start byte
pub const HEADER: u8 = 0x51;

/// First byte is 0x51
pub fn matches_header(bytes: &[u8]) -> bool {
    bytes.first() == Some(&HEADER)
}

/// All six bytes sum to zero
pub fn checksum_ok(bytes: &[u8]) -> bool {
    Checksum::Additive.is_valid(bytes, FRAME_LENGTH)
}

/// Decode a WT440XH frame into the LaCrosse field set
pub fn decode(bytes: &[u8]) -> LaCrosseFrame {
    let b: [u8; FRAME_LENGTH] = padded(bytes);

    let house = b[1] & 0x0F;
    let device = match (b[1] >> 4) & 0x03 {
        0 => 4,
        d => d,
    };

    let mut frame = LaCrosseFrame {
        header: b[0],
        id: (device << 4) | house,
        new_battery: false,
        bit12: false,
        temperature: ((f32::from(b[2]) - 50.0) * 10.0 + f32::from(b[3])) / 10.0,
        weak_battery: b[1] >> 6 != 0,
        humidity: b[4],
        crc: b[5],
        is_valid: false,
    };

    frame.is_valid = matches_header(&b) && checksum_ok(&b) && is_plausible(&frame);
    frame
}

/// Same bounds as LaCrosse sensors
pub fn is_plausible(frame: &LaCrosseFrame) -> bool {
    temperature_in_range(frame.temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reference_frames() {
        let cases: [([u8; 6], u8, f32, u8, bool); 4] = [
            ([0x51, 0x4B, 0x4C, 0x09, 0x17, 0xF8], 0x4B, 26.9, 23, true),
            ([0x51, 0x51, 0x4C, 0x01, 0x40, 0xD1], 0x11, 26.1, 64, true),
            ([0x51, 0x14, 0x4E, 0x00, 0x25, 0x28], 0x14, 28.0, 37, false),
            ([0x51, 0x4F, 0x4C, 0x09, 0x1D, 0xEE], 0x4F, 26.9, 29, true),
        ];

        for (bytes, id, temperature, humidity, weak) in cases {
            let frame = decode(&bytes);
            assert!(frame.is_valid, "{:02X?} rejected", bytes);
            assert_eq!(frame.header, HEADER);
            assert_eq!(frame.id, id);
            assert!((frame.temperature - temperature).abs() < 0.01);
            assert_eq!(frame.humidity, humidity);
            assert_eq!(frame.weak_battery, weak);
            assert!(!frame.new_battery);
        }
    }

    #[test]
    fn test_device_code_zero_means_four() {
        let frame = decode(&[0x51, 0x4B, 0x4C, 0x09, 0x17, 0xF8]);
        assert_eq!(frame.id >> 4, 4);
        assert_eq!(frame.id & 0x0F, 11);
    }

    #[test]
    fn test_below_zero() {
        // 45 - 50 = -5 degrees, plus 3 tenths -> -4.7 °C
        let mut bytes = [0x51, 0x14, 45, 3, 0x40, 0x00];
        bytes[5] = 0u8.wrapping_sub(crate::checksum::sum8(&bytes[..5]));

        let frame = decode(&bytes);
        assert!(frame.is_valid);
        assert!((frame.temperature + 4.7).abs() < 0.01);
    }

    #[test]
    fn test_checksum_mismatch_is_invalid() {
        let bytes = [0x51, 0x4B, 0x4C, 0x09, 0x17, 0xF7];
        assert!(!checksum_ok(&bytes));
        assert!(!decode(&bytes).is_valid);
    }

    #[test]
    fn test_header_required() {
        // Sums to zero but does not start with 0x51
        let bytes = [0x52, 0x4B, 0x4C, 0x09, 0x17, 0xF7];
        assert!(checksum_ok(&bytes));
        assert!(!decode(&bytes).is_valid);
    }
}
