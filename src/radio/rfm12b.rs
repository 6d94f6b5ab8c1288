//! # RFM12B Adapter
//!
//! Command-word FSK transceiver. Every SPI exchange is one 16-bit word; the
//! chip has no packet engine, so received data arrives one byte at a time and
//! transmissions are sent byte by byte behind a sync preamble.

use tracing::{trace, warn};

use super::{FramingMode, Radio, RadioMode, SpiBus, DEFAULT_DATA_RATE, DEFAULT_FREQUENCY_KHZ};

const CMD_STATUS: u16 = 0x0000;
const CMD_RECEIVE: u16 = 0x82C8;
const CMD_FIFO_RESET: u16 = 0xCA81;
const CMD_FIFO_ENABLE: u16 = 0xCA83;
const CMD_IDLE: u16 = 0x8208;
const CMD_TRANSMIT: u16 = 0x8238;
const CMD_SLEEP: u16 = 0x8201;
const CMD_FIFO_READ: u16 = 0xB000;
const CMD_TX_WRITE: u16 = 0xB800;
const CMD_DATA_RATE: u16 = 0xC600;
const CMD_FREQUENCY: u16 = 0xA000;

/// FIFO has data (receive) or TX register is free (transmit)
const STATUS_READY: u16 = 0x8000;

/// Lowest frequency reachable in the 868 MHz band setting, kHz
const BAND_BASE_KHZ: u32 = 860_000;

/// Preamble and sync word sent ahead of every frame
const PREAMBLE: [u8; 5] = [0xAA, 0xAA, 0xAA, 0x2D, 0xD4];

/// Status polls before a TX byte is dropped
const TX_READY_POLLS: usize = 10_000;

/// Data-rate command parameter
pub fn data_rate_parameter(bps: u32) -> u8 {
    match bps {
        17_241 => 0x13,
        9_579 => 0x23,
        other => (344_828 / other.max(1)).saturating_sub(1).min(0xFF) as u8,
    }
}

/// Frequency command word
pub fn frequency_command(khz: u32) -> u16 {
    let offset = khz.saturating_sub(BAND_BASE_KHZ) / 5;
    CMD_FREQUENCY + offset.min(0x0FFF) as u16
}

/// RFM12B transceiver on an SPI bus
pub struct Rfm12b<B: SpiBus> {
    bus: B,
    data_rate: u32,
    frequency_khz: u32,
    mode: RadioMode,
    /// Bytes written while not transmitting, flushed on `Transmit`
    tx_queue: Vec<u8>,
    tx_done: bool,
}

impl<B: SpiBus> Rfm12b<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            data_rate: DEFAULT_DATA_RATE,
            frequency_khz: DEFAULT_FREQUENCY_KHZ,
            mode: RadioMode::Idle,
            tx_queue: Vec::new(),
            tx_done: false,
        }
    }

    /// Carrier frequency last set, kHz
    pub fn frequency(&self) -> u32 {
        self.frequency_khz
    }

    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Exchange one command word, returning the word clocked back
    fn command(&mut self, word: u16) -> u16 {
        let mut buf = word.to_be_bytes();
        if let Err(e) = self.bus.transfer(&mut buf) {
            warn!("RFM12B command 0x{:04X} failed: {}", word, e);
            return 0;
        }
        u16::from_be_bytes(buf)
    }

    fn send_byte(&mut self, byte: u8) -> bool {
        for _ in 0..TX_READY_POLLS {
            if self.command(CMD_STATUS) & STATUS_READY != 0 {
                self.command(CMD_TX_WRITE | u16::from(byte));
                return true;
            }
        }
        warn!("RFM12B TX register never became free, byte 0x{:02X} dropped", byte);
        false
    }

    fn flush_tx(&mut self) {
        let queued = std::mem::take(&mut self.tx_queue);
        let mut ok = true;
        for byte in PREAMBLE.iter().chain(queued.iter()) {
            ok &= self.send_byte(*byte);
        }
        self.tx_done = ok;
    }
}

impl<B: SpiBus> Radio for Rfm12b<B> {
    fn read_register(&mut self, addr: u8) -> u8 {
        self.command(u16::from(addr) << 8) as u8
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        self.command((u16::from(addr) << 8) | u16::from(value));
    }

    fn read_fifo_byte(&mut self) -> u8 {
        self.command(CMD_FIFO_READ) as u8
    }

    fn write_fifo_byte(&mut self, byte: u8) {
        if self.mode == RadioMode::Transmit {
            self.send_byte(byte);
        } else {
            self.tx_queue.push(byte);
        }
    }

    fn set_mode(&mut self, mode: RadioMode) {
        match mode {
            RadioMode::Receive => {
                self.command(CMD_RECEIVE);
                self.command(CMD_FIFO_RESET);
                self.command(CMD_FIFO_ENABLE);
            }
            RadioMode::Idle => {
                self.command(CMD_IDLE);
            }
            RadioMode::Sleep => {
                self.command(CMD_SLEEP);
            }
            RadioMode::Transmit => {
                self.tx_done = false;
                self.command(CMD_TRANSMIT);
                self.flush_tx();
            }
        }
        self.mode = mode;
        trace!("RFM12B mode {:?}", mode);
    }

    fn set_frequency(&mut self, khz: u32) {
        self.frequency_khz = khz;
        self.command(frequency_command(khz));
    }

    fn set_data_rate(&mut self, bps: u32) {
        self.data_rate = bps;
        self.command(CMD_DATA_RATE | u16::from(data_rate_parameter(bps)));
    }

    fn data_rate(&self) -> u32 {
        self.data_rate
    }

    fn payload_ready(&mut self) -> bool {
        self.command(CMD_STATUS) & STATUS_READY != 0
    }

    fn packet_sent(&mut self) -> bool {
        self.tx_done
    }

    fn framing_mode(&self) -> FramingMode {
        FramingMode::Streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Records every command word and answers status/FIFO reads
    #[derive(Default)]
    struct CommandLog {
        words: Vec<u16>,
        ready: bool,
        fifo: VecDeque<u8>,
    }

    impl SpiBus for CommandLog {
        fn transfer(&mut self, buf: &mut [u8]) -> io::Result<()> {
            let word = u16::from_be_bytes([buf[0], buf[1]]);
            self.words.push(word);

            let reply: u16 = match word {
                CMD_STATUS if self.ready => STATUS_READY,
                CMD_FIFO_READ => u16::from(self.fifo.pop_front().unwrap_or(0)),
                _ => 0,
            };
            buf.copy_from_slice(&reply.to_be_bytes());
            Ok(())
        }
    }

    #[test]
    fn test_data_rate_parameter() {
        assert_eq!(data_rate_parameter(17_241), 0x13);
        assert_eq!(data_rate_parameter(9_579), 0x23);
        assert_eq!(data_rate_parameter(4_800), 70);
        assert_eq!(data_rate_parameter(0), 0xFF);
    }

    #[test]
    fn test_frequency_command() {
        assert_eq!(frequency_command(868_300), 0xA000 + 1660);
        assert_eq!(frequency_command(850_000), 0xA000);
    }

    #[test]
    fn test_receive_sequence() {
        let mut radio = Rfm12b::new(CommandLog::default());
        radio.set_mode(RadioMode::Receive);
        radio.set_data_rate(9_579);

        assert_eq!(radio.data_rate(), 9_579);
        let bus = radio.into_inner();
        assert_eq!(bus.words, vec![0x82C8, 0xCA81, 0xCA83, 0xC623]);
    }

    #[test]
    fn test_streaming_fifo() {
        let mut bus = CommandLog::default();
        bus.ready = true;
        bus.fifo.extend([0x9E, 0x05]);

        let mut radio = Rfm12b::new(bus);
        assert_eq!(radio.framing_mode(), FramingMode::Streaming);
        assert!(radio.payload_ready());
        assert_eq!(radio.read_fifo_byte(), 0x9E);
        assert_eq!(radio.read_fifo_byte(), 0x05);
    }

    #[test]
    fn test_transmit_sends_preamble_then_queued_bytes() {
        let mut bus = CommandLog::default();
        bus.ready = true;

        let mut radio = Rfm12b::new(bus);
        radio.set_mode(RadioMode::Idle);
        radio.write_fifo_byte(0x91);
        radio.write_fifo_byte(0x42);
        assert!(!radio.packet_sent());

        radio.set_mode(RadioMode::Transmit);
        assert!(radio.packet_sent());

        let bus = radio.into_inner();
        let written: Vec<u8> = bus
            .words
            .iter()
            .filter(|w| *w & 0xFF00 == CMD_TX_WRITE)
            .map(|w| *w as u8)
            .collect();
        assert_eq!(written, vec![0xAA, 0xAA, 0xAA, 0x2D, 0xD4, 0x91, 0x42]);
        assert_eq!(bus.words[1], CMD_TRANSMIT);
    }

    #[test]
    fn test_transmit_gives_up_when_never_ready() {
        let mut radio = Rfm12b::new(CommandLog::default());
        radio.write_fifo_byte(0x91);
        radio.set_mode(RadioMode::Transmit);
        assert!(!radio.packet_sent());
    }
}
