//! # Capture Replay Radio
//!
//! Packetized radio fed from a recorded capture instead of a transceiver.
//! The capture is JSON Lines, one received payload per line:
//!
//! ```text
//! {"timestamp": "2024-03-01T12:00:00.000Z", "bytes": "9e 05 80 25 e3"}
//! {"timestamp": "2024-03-01T12:00:00.012Z", "bytes": "9e 05 80 25 e3", "data_rate": 17241}
//! ```
//!
//! Payloads are released at their recorded offsets relative to the first
//! line. A record carrying a `data_rate` is only heard while the radio is
//! tuned to that rate.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tracing::{debug, info, trace};

use super::{FramingMode, Radio, RadioMode, DEFAULT_DATA_RATE, DEFAULT_FREQUENCY_KHZ};
use crate::clock::Clock;
use crate::error::{GatewayError, Result};
use crate::sensors::MAX_FRAME_LENGTH;

#[derive(Debug, Deserialize)]
struct CaptureLine {
    timestamp: DateTime<FixedOffset>,
    bytes: String,
    #[serde(default)]
    data_rate: Option<u32>,
}

/// One recorded payload
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    /// Milliseconds after the first record
    pub offset_ms: u64,
    pub bytes: Vec<u8>,
    pub data_rate: Option<u32>,
}

/// Parse `"9e 05 80"` style hex
fn parse_hex(text: &str) -> std::result::Result<Vec<u8>, String> {
    let bytes = text
        .split_whitespace()
        .map(|tok| u8::from_str_radix(tok, 16).map_err(|_| format!("invalid hex byte '{}'", tok)))
        .collect::<std::result::Result<Vec<u8>, String>>()?;

    if bytes.is_empty() {
        return Err("empty payload".to_string());
    }
    if bytes.len() > MAX_FRAME_LENGTH {
        return Err(format!(
            "payload of {} bytes exceeds {}",
            bytes.len(),
            MAX_FRAME_LENGTH
        ));
    }
    Ok(bytes)
}

/// Read a capture, skipping blank lines
pub fn read_capture<R: BufRead>(reader: R) -> Result<Vec<CaptureRecord>> {
    let mut records = Vec::new();
    let mut origin: Option<DateTime<FixedOffset>> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let parsed: CaptureLine =
            serde_json::from_str(&line).map_err(|e| GatewayError::Capture {
                line: number,
                reason: e.to_string(),
            })?;

        let bytes = parse_hex(&parsed.bytes)
            .map_err(|reason| GatewayError::Capture { line: number, reason })?;

        let origin = *origin.get_or_insert(parsed.timestamp);
        let offset_ms = (parsed.timestamp - origin).num_milliseconds();
        if offset_ms < 0 {
            return Err(GatewayError::Capture {
                line: number,
                reason: "timestamp earlier than the first record".to_string(),
            });
        }

        records.push(CaptureRecord {
            offset_ms: offset_ms as u64,
            bytes,
            data_rate: parsed.data_rate,
        });
    }

    Ok(records)
}

/// Radio replaying a capture against a clock
pub struct ReplayRadio<C: Clock> {
    records: VecDeque<CaptureRecord>,
    clock: C,
    start_ms: Option<u64>,
    mode: RadioMode,
    data_rate: u32,
    frequency_khz: u32,
    fifo: VecDeque<u8>,
    tx_buffer: Vec<u8>,
    tx_done: bool,
    /// Every completed transmission, in order
    transmitted: Vec<Vec<u8>>,
}

impl<C: Clock> ReplayRadio<C> {
    pub fn new(records: Vec<CaptureRecord>, clock: C) -> Self {
        Self {
            records: records.into(),
            clock,
            start_ms: None,
            mode: RadioMode::Idle,
            data_rate: DEFAULT_DATA_RATE,
            frequency_khz: DEFAULT_FREQUENCY_KHZ,
            fifo: VecDeque::new(),
            tx_buffer: Vec::new(),
            tx_done: false,
            transmitted: Vec::new(),
        }
    }

    /// Load a capture file
    pub fn open<P: AsRef<Path>>(path: P, clock: C) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let records = read_capture(BufReader::new(file))?;
        info!("Loaded {} captured payloads from {}", records.len(), path.display());
        Ok(Self::new(records, clock))
    }

    /// Records not yet delivered or skipped
    pub fn remaining(&self) -> usize {
        self.records.len()
    }

    pub fn frequency(&self) -> u32 {
        self.frequency_khz
    }

    pub fn transmitted(&self) -> &[Vec<u8>] {
        &self.transmitted
    }

    fn elapsed_ms(&mut self) -> u64 {
        let now = self.clock.now_ms();
        now - *self.start_ms.get_or_insert(now)
    }

    /// Move the next due record into the FIFO
    fn load_due(&mut self) {
        let elapsed = self.elapsed_ms();

        while let Some(record) = self.records.front() {
            if record.offset_ms > elapsed {
                return;
            }

            let Some(record) = self.records.pop_front() else {
                return;
            };

            match record.data_rate {
                Some(rate) if rate != self.data_rate => {
                    trace!(
                        "Replay skipped payload at {} ms, recorded at {} bit/s, tuned to {}",
                        record.offset_ms,
                        rate,
                        self.data_rate
                    );
                }
                _ => {
                    let mut payload = record.bytes;
                    payload.resize(MAX_FRAME_LENGTH, 0);
                    self.fifo.extend(payload);
                    return;
                }
            }
        }
    }
}

impl<C: Clock> Radio for ReplayRadio<C> {
    fn read_register(&mut self, _addr: u8) -> u8 {
        0
    }

    fn write_register(&mut self, _addr: u8, _value: u8) {}

    fn read_fifo_byte(&mut self) -> u8 {
        self.fifo.pop_front().unwrap_or(0)
    }

    fn write_fifo_byte(&mut self, byte: u8) {
        self.tx_buffer.push(byte);
    }

    fn set_mode(&mut self, mode: RadioMode) {
        match mode {
            RadioMode::Transmit => {
                let frame = std::mem::take(&mut self.tx_buffer);
                debug!("Replay radio transmitting {:02X?}", frame);
                self.transmitted.push(frame);
                self.tx_done = true;
            }
            RadioMode::Idle | RadioMode::Sleep => {
                self.fifo.clear();
                self.tx_done = false;
            }
            RadioMode::Receive => {}
        }
        self.mode = mode;
    }

    fn set_frequency(&mut self, khz: u32) {
        self.frequency_khz = khz;
    }

    fn set_data_rate(&mut self, bps: u32) {
        self.data_rate = bps;
    }

    fn data_rate(&self) -> u32 {
        self.data_rate
    }

    fn payload_ready(&mut self) -> bool {
        if self.mode != RadioMode::Receive {
            return false;
        }
        if self.fifo.is_empty() {
            self.load_due();
        }
        !self.fifo.is_empty()
    }

    fn packet_sent(&mut self) -> bool {
        self.tx_done
    }

    fn framing_mode(&self) -> FramingMode {
        FramingMode::Packetized
    }
}
