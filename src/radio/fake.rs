//! Test doubles for the radio layer.

use std::collections::VecDeque;
use std::io;

use super::{FramingMode, Radio, RadioMode, SpiBus, DEFAULT_DATA_RATE};
use crate::sensors::MAX_FRAME_LENGTH;

/// SPI bus answering like a bank of 8-bit registers
///
/// `[addr | 0x80, value]` writes, `[addr, _]` reads.
pub(crate) struct RegisterFile {
    pub regs: [u8; 128],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self { regs: [0; 128] }
    }
}

impl SpiBus for RegisterFile {
    fn transfer(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if buf.len() != 2 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "expected 2 bytes"));
        }

        let addr = usize::from(buf[0] & 0x7F);
        if buf[0] & 0x80 != 0 {
            self.regs[addr] = buf[1];
        } else {
            buf[1] = self.regs[addr];
        }
        Ok(())
    }
}

/// Scripted radio
///
/// Packetized: every queued candidate becomes one 64-byte payload.
/// Streaming: queued candidates are concatenated into a byte stream, one
/// byte per ready indication.
pub(crate) struct FakeRadio {
    framing: FramingMode,
    incoming: VecDeque<Vec<u8>>,
    fifo: VecDeque<u8>,
    pub modes: Vec<RadioMode>,
    pub rates: Vec<u32>,
    pub sent: Vec<u8>,
    pub send_completes: bool,
    data_rate: u32,
}

impl FakeRadio {
    pub fn new(framing: FramingMode) -> Self {
        Self {
            framing,
            incoming: VecDeque::new(),
            fifo: VecDeque::new(),
            modes: Vec::new(),
            rates: Vec::new(),
            sent: Vec::new(),
            send_completes: true,
            data_rate: DEFAULT_DATA_RATE,
        }
    }

    pub fn packetized() -> Self {
        Self::new(FramingMode::Packetized)
    }

    pub fn streaming() -> Self {
        Self::new(FramingMode::Streaming)
    }

    /// Queue one received candidate
    pub fn push(&mut self, bytes: &[u8]) {
        match self.framing {
            FramingMode::Packetized => {
                let mut payload = bytes.to_vec();
                payload.resize(MAX_FRAME_LENGTH, 0);
                self.incoming.push_back(payload);
            }
            FramingMode::Streaming => self.fifo.extend(bytes.iter().copied()),
        }
    }

    pub fn pending(&self) -> usize {
        self.incoming.len() + self.fifo.len()
    }
}

impl Radio for FakeRadio {
    fn read_register(&mut self, _addr: u8) -> u8 {
        0
    }

    fn write_register(&mut self, _addr: u8, _value: u8) {}

    fn read_fifo_byte(&mut self) -> u8 {
        self.fifo.pop_front().unwrap_or(0)
    }

    fn write_fifo_byte(&mut self, byte: u8) {
        self.sent.push(byte);
    }

    fn set_mode(&mut self, mode: RadioMode) {
        self.modes.push(mode);
    }

    fn set_frequency(&mut self, _khz: u32) {}

    fn set_data_rate(&mut self, bps: u32) {
        self.data_rate = bps;
        self.rates.push(bps);
    }

    fn data_rate(&self) -> u32 {
        self.data_rate
    }

    fn payload_ready(&mut self) -> bool {
        if self.framing == FramingMode::Packetized && self.fifo.is_empty() {
            if let Some(payload) = self.incoming.pop_front() {
                self.fifo.extend(payload);
            }
        }
        !self.fifo.is_empty()
    }

    fn packet_sent(&mut self) -> bool {
        self.send_completes
    }

    fn framing_mode(&self) -> FramingMode {
        self.framing
    }
}
