//! # Protocol Dispatcher
//!
//! Offers a raw frame to each protocol in [`DISPATCH_ORDER`] and returns the
//! first valid decode. A header mismatch is a silent skip; every other
//! rejection is counted and, in debug mode, logged.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::receiver::RawFrame;
use crate::sensors::{Frame, Protocol};

/// Order in which protocols are tried
///
/// WH1080 and WS1600 share the 0xA start nibble; a frame valid for both is
/// reported as WH1080.
pub const DISPATCH_ORDER: [Protocol; 7] = [
    Protocol::LaCrosse,
    Protocol::LevelSender,
    Protocol::Tx38It,
    Protocol::Emt7110,
    Protocol::Wt440xh,
    Protocol::Wh1080,
    Protocol::Ws1600,
];

/// Why a protocol with a matching header did not accept a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fewer bytes than the protocol's frame length
    Length,
    /// CRC or sum mismatch
    Checksum,
    /// Decoded values outside physical bounds
    Implausible,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rejection::Length => "too short",
            Rejection::Checksum => "checksum mismatch",
            Rejection::Implausible => "implausible values",
        };
        f.write_str(text)
    }
}

/// Dispatch counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    /// Raw frames offered
    pub received: u64,
    /// Raw frames no protocol accepted
    pub unmatched: u64,
    pub length: u64,
    pub checksum: u64,
    pub implausible: u64,
    /// Accepted frames per protocol
    pub decoded: HashMap<Protocol, u64>,
}

impl DispatchStats {
    fn reject(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::Length => self.length += 1,
            Rejection::Checksum => self.checksum += 1,
            Rejection::Implausible => self.implausible += 1,
        }
    }

    /// Total accepted frames
    pub fn total_decoded(&self) -> u64 {
        self.decoded.values().sum()
    }
}

/// Try one protocol on `bytes`
///
/// `Ok(None)` means the header does not match.
pub fn try_protocol(protocol: Protocol, bytes: &[u8]) -> Result<Option<Frame>, Rejection> {
    if !protocol.matches_header(bytes) {
        return Ok(None);
    }

    match protocol.frame_length(bytes) {
        Some(length) if length <= bytes.len() => {}
        _ => return Err(Rejection::Length),
    }

    if !protocol.checksum_ok(bytes) {
        return Err(Rejection::Checksum);
    }

    let frame = protocol.decode(bytes);
    if !protocol.is_plausible(&frame) {
        return Err(Rejection::Implausible);
    }
    debug_assert!(frame.is_valid(), "{} frame passed every check but is invalid", protocol);

    Ok(Some(frame))
}

/// First protocol in dispatch order whose header matches `bytes`
pub fn first_header_match(bytes: &[u8]) -> Option<Protocol> {
    DISPATCH_ORDER.into_iter().find(|p| p.matches_header(bytes))
}

/// Routes raw frames to the protocol codecs
#[derive(Debug, Default)]
pub struct Dispatcher {
    debug: bool,
    stats: DispatchStats,
}

impl Dispatcher {
    /// `debug` logs every rejection
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Decode a received frame with the first protocol that accepts it
    pub fn dispatch(&mut self, raw: &RawFrame) -> Option<Frame> {
        self.dispatch_bytes(raw.bytes())
    }

    pub fn dispatch_bytes(&mut self, bytes: &[u8]) -> Option<Frame> {
        self.stats.received += 1;

        for protocol in DISPATCH_ORDER {
            match try_protocol(protocol, bytes) {
                Ok(Some(frame)) => {
                    *self.stats.decoded.entry(protocol).or_insert(0) += 1;
                    return Some(frame);
                }
                Ok(None) => {}
                Err(rejection) => {
                    self.stats.reject(rejection);
                    if self.debug {
                        debug!("{} rejected {:02X?}: {}", protocol, bytes, rejection);
                    }
                }
            }
        }

        self.stats.unmatched += 1;
        None
    }
}
