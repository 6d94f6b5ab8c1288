//! # Frame Receiver
//!
//! Turns radio FIFO data into raw candidate frames and folds back-to-back
//! repeats of the same frame into one frame with a repeat count.
//!
//! Packetized radios hand over whole 64-byte payloads. Streaming radios hand
//! over single bytes; a candidate ends when
//! - at least 8 bytes are buffered and their byte sum is zero,
//! - or nothing arrived for more than 50 ms,
//! - or 32 bytes are buffered.

use tracing::trace;

use crate::checksum::sum8_update;
use crate::clock::Clock;
use crate::radio::{FramingMode, Radio, RadioMode};
use crate::sensors::MAX_FRAME_LENGTH;

/// Most repeats folded into one frame
pub const MAX_REPEATS: u8 = 8;

/// A repeat must follow the previous copy within this window
pub const REPEAT_WINDOW_MS: u64 = 50;

/// Streaming: gap that ends a candidate
pub const STREAM_IDLE_MS: u64 = 50;

/// Streaming: hard cap on candidate length
pub const STREAM_MAX_LENGTH: usize = 32;

/// Streaming: shortest candidate ended by a zero byte sum
pub const STREAM_MIN_SUM_LENGTH: usize = 8;

/// A received byte sequence before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    buf: [u8; MAX_FRAME_LENGTH],
    len: usize,
    /// Number of identical copies received back to back, at least 1
    pub repeats: u8,
    /// Clock reading when the first copy completed
    pub timestamp_ms: u64,
}

impl RawFrame {
    /// Copy up to [`MAX_FRAME_LENGTH`] bytes
    pub fn new(bytes: &[u8], timestamp_ms: u64) -> Self {
        let len = bytes.len().min(MAX_FRAME_LENGTH);
        let mut buf = [0u8; MAX_FRAME_LENGTH];
        buf[..len].copy_from_slice(&bytes[..len]);

        Self {
            buf,
            len,
            repeats: 1,
            timestamp_ms,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `other` starts with exactly this frame's bytes
    fn is_repeated_by(&self, other: &RawFrame) -> bool {
        other.len >= self.len && other.buf[..self.len] == self.buf[..self.len]
    }
}

/// Candidate assembly and repeat aggregation
#[derive(Debug)]
pub struct FrameReceiver {
    stream: [u8; MAX_FRAME_LENGTH],
    stream_len: usize,
    residual: u8,
    last_byte_ms: u64,
    /// Candidate that ended the previous repeat chain
    pending: Option<RawFrame>,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReceiver {
    pub fn new() -> Self {
        Self {
            stream: [0; MAX_FRAME_LENGTH],
            stream_len: 0,
            residual: 0,
            last_byte_ms: 0,
            pending: None,
        }
    }

    /// Non-blocking step, returns a completed candidate if there is one
    pub fn poll<R, C>(&mut self, radio: &mut R, clock: &C) -> Option<RawFrame>
    where
        R: Radio + ?Sized,
        C: Clock + ?Sized,
    {
        match radio.framing_mode() {
            FramingMode::Packetized => self.poll_packet(radio, clock),
            FramingMode::Streaming => self.poll_stream(radio, clock),
        }
    }

    fn poll_packet<R, C>(&mut self, radio: &mut R, clock: &C) -> Option<RawFrame>
    where
        R: Radio + ?Sized,
        C: Clock + ?Sized,
    {
        if !radio.payload_ready() {
            return None;
        }

        let mut payload = [0u8; MAX_FRAME_LENGTH];
        for byte in payload.iter_mut() {
            *byte = radio.read_fifo_byte();
        }
        Some(RawFrame::new(&payload, clock.now_ms()))
    }

    fn poll_stream<R, C>(&mut self, radio: &mut R, clock: &C) -> Option<RawFrame>
    where
        R: Radio + ?Sized,
        C: Clock + ?Sized,
    {
        let now = clock.now_ms();

        if radio.payload_ready() {
            let byte = radio.read_fifo_byte();
            self.stream[self.stream_len] = byte;
            self.stream_len += 1;
            self.residual = sum8_update(self.residual, byte);
            self.last_byte_ms = now;
        }

        let sum_closed = self.stream_len >= STREAM_MIN_SUM_LENGTH && self.residual == 0;
        let idle = self.stream_len > 0 && now > self.last_byte_ms + STREAM_IDLE_MS;
        let full = self.stream_len >= STREAM_MAX_LENGTH;

        if !(sum_closed || idle || full) {
            return None;
        }

        let frame = RawFrame::new(&self.stream[..self.stream_len], now);
        self.stream_len = 0;
        self.residual = 0;
        Some(frame)
    }

    /// Receive one candidate and fold its repeats into it
    ///
    /// Returns `None` when no candidate is ready. Otherwise keeps taking
    /// candidates while they start with the reference bytes, until one
    /// differs or is shorter, [`MAX_REPEATS`] copies are counted, or
    /// [`REPEAT_WINDOW_MS`] pass without a candidate. The radio is put back
    /// into receive mode after every candidate. A candidate that ends the
    /// chain is kept as the reference of the next call.
    pub fn receive<R, C>(&mut self, radio: &mut R, clock: &C) -> Option<RawFrame>
    where
        R: Radio + ?Sized,
        C: Clock + ?Sized,
    {
        let mut reference = match self.pending.take() {
            Some(frame) => frame,
            None => {
                let frame = self.poll(radio, clock)?;
                radio.set_mode(RadioMode::Receive);
                frame
            }
        };

        let mut last_match_ms = clock.now_ms();

        while reference.repeats < MAX_REPEATS {
            match self.poll(radio, clock) {
                Some(candidate) => {
                    radio.set_mode(RadioMode::Receive);
                    if !reference.is_repeated_by(&candidate) {
                        trace!("Repeat chain ended by a different frame");
                        self.pending = Some(candidate);
                        break;
                    }
                    reference.repeats += 1;
                    last_match_ms = clock.now_ms();
                }
                None => {
                    if clock.now_ms() >= last_match_ms + REPEAT_WINDOW_MS {
                        break;
                    }
                }
            }
        }

        trace!("Received {} bytes x{}", reference.len(), reference.repeats);
        Some(reference)
    }
}
