//! # Checksum Engine
//!
//! The two checksum families used by the supported sensors.
//!
//! **CRC-8**: polynomial 0x31, MSB first, initial value 0x00, no final XOR.
//! **Additive**: byte sum modulo 256, a frame is valid when the sum is zero.

/// CRC-8 polynomial used by LaCrosse, TX38IT, WH1080 and LevelSender
const CRC8_POLY: u8 = 0x31;

/// Precomputed CRC8 lookup table for fast calculation
const CRC8_TABLE: [u8; 256] = generate_crc8_table();

/// Generate CRC8 lookup table at compile time
const fn generate_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the CRC-8 over whole bytes using the lookup table
///
/// # Examples
///
/// ```
/// use lacrosse_gateway::checksum::crc8;
///
/// let mut frame = vec![0x91, 0x46, 0x21, 0x2E];
/// frame.push(crc8(&frame));
/// assert_eq!(crc8(&frame), 0);
/// ```
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in data {
        crc = CRC8_TABLE[(crc ^ byte) as usize];
    }

    crc
}

/// Calculate the CRC-8 over the first `bits` bits of `data`
///
/// Bits are fed MSB first. A trailing partial byte contributes only its
/// leading bits; the TX38IT checksum covers exactly 20 bits of 3 bytes.
/// Bits past the end of `data` are ignored.
pub fn crc8_bits(data: &[u8], bits: usize) -> u8 {
    let mut crc: u8 = 0;

    for (index, &byte) in data.iter().enumerate() {
        let mut value = byte;

        for bit in 0..8 {
            if index * 8 + bit >= bits {
                return crc;
            }

            let top = (crc ^ value) & 0x80;
            crc <<= 1;
            if top != 0 {
                crc ^= CRC8_POLY;
            }
            value <<= 1;
        }
    }

    crc
}

/// Sum all bytes modulo 256
pub fn sum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &byte| sum8_update(acc, byte))
}

/// Add one byte to a running additive residual
pub fn sum8_update(residual: u8, byte: u8) -> u8 {
    residual.wrapping_add(byte)
}

/// Checksum family of a protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checksum {
    /// CRC-8/0x31, trailing CRC byte
    Crc8,
    /// Sum of all bytes including the trailing checksum is zero
    Additive,
}

impl Checksum {
    /// Residual of the first `len` bytes
    ///
    /// For [`Checksum::Crc8`] this is the CRC of those bytes; for
    /// [`Checksum::Additive`] it is their sum. `len` is clamped to the
    /// slice length.
    pub fn residual(self, bytes: &[u8], len: usize) -> u8 {
        let data = &bytes[..len.min(bytes.len())];
        match self {
            Checksum::Crc8 => crc8(data),
            Checksum::Additive => sum8(data),
        }
    }

    /// Whether the first `len` bytes form a valid checksummed frame
    ///
    /// Additive: `sum(bytes[..len]) == 0`.
    /// CRC-8: `bytes[len - 1] == crc8(bytes[..len - 1])`.
    pub fn is_valid(self, bytes: &[u8], len: usize) -> bool {
        if len == 0 || len > bytes.len() {
            return false;
        }

        match self {
            Checksum::Crc8 => bytes[len - 1] == self.residual(bytes, len - 1),
            Checksum::Additive => self.residual(bytes, len) == 0,
        }
    }
}

/// Bitwise CRC-8, used to verify the lookup table
#[cfg(test)]
fn crc8_slow(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in data {
        crc ^= byte;

        for _ in 0..8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_empty() {
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn test_crc8_single_byte() {
        assert_eq!(crc8(&[0x00]), 0x00);
        assert_eq!(crc8(&[0x01]), CRC8_POLY);

        let crc = crc8(&[0xFF]);
        assert_eq!(crc, crc8_slow(&[0xFF]));
        assert_ne!(crc, 0x00);
    }

    #[test]
    fn test_crc8_lookup_table_matches_slow() {
        let test_data = [
            vec![0x91, 0x46, 0x21, 0x2E],
            vec![0xA4, 0xF0, 0x27, 0x47, 0x00, 0x00, 0x03, 0xC6, 0x0C],
            vec![0xB1, 0x07, 0x96, 0x15, 0x60],
            vec![0x00; 9],
            vec![0xFF; 10],
        ];

        for data in test_data.iter() {
            assert_eq!(crc8(data), crc8_slow(data), "CRC mismatch for data: {:?}", data);
        }
    }

    #[test]
    fn test_crc8_whole_bytes_match_bit_counted_form() {
        let data = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(crc8(&data), crc8_bits(&data, 32));
        assert_eq!(crc8(&data[..3]), crc8_bits(&data, 24));
    }

    #[test]
    fn test_crc8_appended_crc_gives_zero_residual() {
        let mut data = vec![0x9A, 0x5B, 0x61, 0x34];
        let crc = crc8(&data);
        data.push(crc);
        assert_eq!(crc8(&data), 0);
    }

    #[test]
    fn test_crc8_bits_ignores_trailing_bits() {
        // Only the high nibble of the third byte is covered
        let a = [0xC5, 0x26, 0x40];
        let b = [0xC5, 0x26, 0x4F];
        assert_eq!(crc8_bits(&a, 20), crc8_bits(&b, 20));

        let c = [0xC5, 0x26, 0x50];
        assert_ne!(crc8_bits(&a, 20), crc8_bits(&c, 20));
    }

    #[test]
    fn test_crc8_bits_past_end_of_data() {
        let data = [0xAB];
        assert_eq!(crc8_bits(&data, 64), crc8(&data));
    }

    #[test]
    fn test_sum8_wraps() {
        assert_eq!(sum8(&[0xFF, 0x02]), 0x01);
        assert_eq!(sum8(&[0x51, 0x4B, 0x4C, 0x09, 0x17, 0xF8]), 0x00);
    }

    #[test]
    fn test_checksum_crc8_is_valid() {
        let mut frame = vec![0x91, 0x46, 0x21, 0x2E];
        frame.push(crc8(&frame));
        assert!(Checksum::Crc8.is_valid(&frame, 5));

        frame[4] ^= 0x01;
        assert!(!Checksum::Crc8.is_valid(&frame, 5));
    }

    #[test]
    fn test_checksum_additive_is_valid() {
        let frame = [0x51, 0x4B, 0x4C, 0x09, 0x17, 0xF8];
        assert!(Checksum::Additive.is_valid(&frame, 6));
        assert!(!Checksum::Additive.is_valid(&frame, 5));
    }

    #[test]
    fn test_checksum_rejects_bad_lengths() {
        let frame = [0x00, 0x00];
        assert!(!Checksum::Crc8.is_valid(&frame, 0));
        assert!(!Checksum::Additive.is_valid(&frame, 3));
    }

    #[test]
    fn test_checksum_residual_is_pure() {
        let frame = [0x25, 0x6A, 0x15, 0x4B];
        assert_eq!(Checksum::Crc8.residual(&frame, 4), Checksum::Crc8.residual(&frame, 4));
        assert_eq!(Checksum::Additive.residual(&frame, 2), 0x8F);
    }
}
