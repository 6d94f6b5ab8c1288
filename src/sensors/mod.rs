//! # Sensor Codecs
//!
//! Bit-field codecs for the supported 868 MHz sensor families.
//!
//! This module handles:
//! - The closed set of supported protocols ([`Protocol`])
//! - The decoded frame of each protocol ([`Frame`])
//! - Header predicates, frame lengths, checksum checks and plausibility bounds
//! - Encoding for the protocols that can be transmitted
//!
//! Every `decode` is total: it never panics and always returns a frame whose
//! `is_valid` flag is set only when the header, the checksum and the
//! protocol's plausibility bounds all pass.

pub mod emt7110;
pub mod lacrosse;
pub mod level_sender;
pub mod tx38it;
pub mod wh1080;
pub mod ws1600;
pub mod wt440xh;

use std::fmt;

use crate::checksum::Checksum;

pub use emt7110::Emt7110Frame;
pub use lacrosse::LaCrosseFrame;
pub use level_sender::LevelSenderFrame;
pub use tx38it::Tx38ItFrame;
pub use wh1080::Wh1080Frame;
pub use ws1600::Ws1600Frame;

/// Maximum raw frame size delivered by the radio
pub const MAX_FRAME_LENGTH: usize = 64;

/// 16-point compass used by the wind vane of WH1080 and WS1600 stations
pub const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE",
    "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
];

/// Supported sensor protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// LaCrosse IT+ (TX29, TX35, ...)
    LaCrosse,
    /// Technoline TX38-IT
    Tx38It,
    /// Fine Offset WH1080 / Alecto WS4000
    Wh1080,
    /// Alecto WS1600
    Ws1600,
    /// Hideki WT440XH
    Wt440xh,
    /// Energy meter EMT7110
    Emt7110,
    /// Ultrasonic level sender
    LevelSender,
}

impl Protocol {
    /// Display name used in diagnostic output
    pub fn name(self) -> &'static str {
        match self {
            Protocol::LaCrosse => "LaCrosse",
            Protocol::Tx38It => "TX38IT",
            Protocol::Wh1080 => "WH1080",
            Protocol::Ws1600 => "WS1600",
            Protocol::Wt440xh => "WT440XH",
            Protocol::Emt7110 => "EMT7110",
            Protocol::LevelSender => "LevelSender",
        }
    }

    /// Checksum family of the protocol
    ///
    /// TX38IT uses CRC-8 over a bit-truncated prefix, see [`tx38it`].
    pub fn checksum(self) -> Checksum {
        match self {
            Protocol::LaCrosse | Protocol::Tx38It | Protocol::Wh1080 | Protocol::LevelSender => {
                Checksum::Crc8
            }
            Protocol::Ws1600 | Protocol::Wt440xh | Protocol::Emt7110 => Checksum::Additive,
        }
    }

    /// Whether the leading bits of `bytes` carry this protocol's header
    pub fn matches_header(self, bytes: &[u8]) -> bool {
        match self {
            Protocol::LaCrosse => lacrosse::matches_header(bytes),
            Protocol::Tx38It => tx38it::matches_header(bytes),
            Protocol::Wh1080 => wh1080::matches_header(bytes),
            Protocol::Ws1600 => ws1600::matches_header(bytes),
            Protocol::Wt440xh => wt440xh::matches_header(bytes),
            Protocol::Emt7110 => emt7110::matches_header(bytes),
            Protocol::LevelSender => level_sender::matches_header(bytes),
        }
    }

    /// Frame length for a frame starting with `prefix`
    ///
    /// Fixed for every protocol except WS1600, whose length follows from the
    /// data-set count nibble. Returns `None` when the prefix is too short to
    /// tell.
    pub fn frame_length(self, prefix: &[u8]) -> Option<usize> {
        match self {
            Protocol::LaCrosse => Some(lacrosse::FRAME_LENGTH),
            Protocol::Tx38It => Some(tx38it::FRAME_LENGTH),
            Protocol::Wh1080 => Some(wh1080::FRAME_LENGTH),
            Protocol::Ws1600 => ws1600::frame_length(prefix),
            Protocol::Wt440xh => Some(wt440xh::FRAME_LENGTH),
            Protocol::Emt7110 => Some(emt7110::FRAME_LENGTH),
            Protocol::LevelSender => Some(level_sender::FRAME_LENGTH),
        }
    }

    /// Whether the checksum of the frame at the start of `bytes` passes
    pub fn checksum_ok(self, bytes: &[u8]) -> bool {
        match self {
            Protocol::LaCrosse => lacrosse::checksum_ok(bytes),
            Protocol::Tx38It => tx38it::checksum_ok(bytes),
            Protocol::Wh1080 => wh1080::checksum_ok(bytes),
            Protocol::Ws1600 => ws1600::checksum_ok(bytes),
            Protocol::Wt440xh => wt440xh::checksum_ok(bytes),
            Protocol::Emt7110 => emt7110::checksum_ok(bytes),
            Protocol::LevelSender => level_sender::checksum_ok(bytes),
        }
    }

    /// Decode the frame at the start of `bytes`
    pub fn decode(self, bytes: &[u8]) -> Frame {
        match self {
            Protocol::LaCrosse => Frame::LaCrosse(lacrosse::decode(bytes)),
            Protocol::Tx38It => Frame::Tx38It(tx38it::decode(bytes)),
            Protocol::Wh1080 => Frame::Wh1080(wh1080::decode(bytes)),
            Protocol::Ws1600 => Frame::Ws1600(ws1600::decode(bytes)),
            Protocol::Wt440xh => Frame::Wt440xh(wt440xh::decode(bytes)),
            Protocol::Emt7110 => Frame::Emt7110(emt7110::decode(bytes)),
            Protocol::LevelSender => Frame::LevelSender(level_sender::decode(bytes)),
        }
    }

    /// Whether frames of this protocol can be transmitted
    pub fn supports_encode(self) -> bool {
        matches!(self, Protocol::LaCrosse | Protocol::Tx38It | Protocol::LevelSender)
    }

    /// Encode `frame` into raw bytes
    ///
    /// Returns `None` when the protocol cannot be transmitted or the frame
    /// belongs to another protocol.
    pub fn encode(self, frame: &Frame) -> Option<Vec<u8>> {
        match (self, frame) {
            (Protocol::LaCrosse, Frame::LaCrosse(f)) => Some(lacrosse::encode(f).to_vec()),
            (Protocol::Tx38It, Frame::Tx38It(f)) => Some(tx38it::encode(f).to_vec()),
            (Protocol::LevelSender, Frame::LevelSender(f)) => Some(level_sender::encode(f).to_vec()),
            _ => None,
        }
    }

    /// Physical range check of a decoded frame
    pub fn is_plausible(self, frame: &Frame) -> bool {
        match (self, frame) {
            (Protocol::LaCrosse, Frame::LaCrosse(f)) => lacrosse::is_plausible(f),
            (Protocol::Tx38It, Frame::Tx38It(f)) => tx38it::is_plausible(f),
            (Protocol::Wh1080, Frame::Wh1080(f)) => wh1080::is_plausible(f),
            (Protocol::Ws1600, Frame::Ws1600(f)) => ws1600::is_plausible(f),
            (Protocol::Wt440xh, Frame::Wt440xh(f)) => wt440xh::is_plausible(f),
            (Protocol::Emt7110, Frame::Emt7110(f)) => emt7110::is_plausible(f),
            (Protocol::LevelSender, Frame::LevelSender(f)) => level_sender::is_plausible(f),
            _ => false,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded frame of one of the supported protocols
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    LaCrosse(LaCrosseFrame),
    Tx38It(Tx38ItFrame),
    Wh1080(Wh1080Frame),
    Ws1600(Ws1600Frame),
    /// WT440XH frames are mapped onto the LaCrosse field set
    Wt440xh(LaCrosseFrame),
    Emt7110(Emt7110Frame),
    LevelSender(LevelSenderFrame),
}

impl Frame {
    /// Protocol that produced this frame
    pub fn protocol(&self) -> Protocol {
        match self {
            Frame::LaCrosse(_) => Protocol::LaCrosse,
            Frame::Tx38It(_) => Protocol::Tx38It,
            Frame::Wh1080(_) => Protocol::Wh1080,
            Frame::Ws1600(_) => Protocol::Ws1600,
            Frame::Wt440xh(_) => Protocol::Wt440xh,
            Frame::Emt7110(_) => Protocol::Emt7110,
            Frame::LevelSender(_) => Protocol::LevelSender,
        }
    }

    /// Header, checksum and plausibility all passed
    pub fn is_valid(&self) -> bool {
        match self {
            Frame::LaCrosse(f) | Frame::Wt440xh(f) => f.is_valid,
            Frame::Tx38It(f) => f.is_valid,
            Frame::Wh1080(f) => f.is_valid,
            Frame::Ws1600(f) => f.is_valid,
            Frame::Emt7110(f) => f.is_valid,
            Frame::LevelSender(f) => f.is_valid,
        }
    }

    /// Checksum or CRC value carried by the frame
    pub fn crc(&self) -> u8 {
        match self {
            Frame::LaCrosse(f) | Frame::Wt440xh(f) => f.crc,
            Frame::Tx38It(f) => f.crc,
            Frame::Wh1080(f) => f.crc,
            Frame::Ws1600(f) => f.crc,
            Frame::Emt7110(f) => f.crc,
            Frame::LevelSender(f) => f.crc,
        }
    }

    /// Number of raw bytes this frame occupies
    pub fn length(&self) -> usize {
        match self {
            Frame::Ws1600(f) => f.length,
            other => other
                .protocol()
                .frame_length(&[])
                .unwrap_or(MAX_FRAME_LENGTH),
        }
    }
}

/// Copy `bytes` into a zero-padded fixed buffer
///
/// Lets the codecs index freely while keeping `decode` total on short input.
pub(crate) fn padded<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    let n = bytes.len().min(N);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

/// Three BCD nibbles to an integer (hundreds, tens, ones)
pub(crate) fn bcd3(hundreds: u8, tens: u8, ones: u8) -> u16 {
    u16::from(hundreds) * 100 + u16::from(tens) * 10 + u16::from(ones)
}

/// Split a value below 1000 into three decimal digits
pub(crate) fn digits3(value: u16) -> (u8, u8, u8) {
    let value = value.min(999);
    ((value / 100) as u8, ((value / 10) % 10) as u8, (value % 10) as u8)
}

/// Temperature in tenths of a degree offset by 40 °C, as used on the wire
pub(crate) fn offset_tenths(temperature: f32) -> u16 {
    ((temperature + 40.0) * 10.0).round().max(0.0) as u16
}

/// Inverse of [`offset_tenths`]
pub(crate) fn from_offset_tenths(tenths: u16) -> f32 {
    f32::from(tenths) / 10.0 - 40.0
}

/// Outdoor temperature bound shared by the thermo/hygro sensors
pub(crate) fn temperature_in_range(temperature: f32) -> bool {
    (-40.0..60.0).contains(&temperature)
}
