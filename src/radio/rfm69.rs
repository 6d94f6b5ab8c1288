//! # RFM69 Adapter
//!
//! Register-addressed FSK transceiver. The chip is configured for fixed
//! 64-byte payloads, so every ready indication hands over a whole payload.

use tracing::{trace, warn};

use super::{FramingMode, Radio, RadioMode, SpiBus, DEFAULT_DATA_RATE, DEFAULT_FREQUENCY_KHZ};

/// FIFO read/write access
pub const REG_FIFO: u8 = 0x00;
pub const REG_OPMODE: u8 = 0x01;
pub const REG_BITRATEMSB: u8 = 0x03;
pub const REG_BITRATELSB: u8 = 0x04;
pub const REG_FRFMSB: u8 = 0x07;
pub const REG_FRFMID: u8 = 0x08;
pub const REG_FRFLSB: u8 = 0x09;
pub const REG_IRQFLAGS2: u8 = 0x28;
pub const REG_PAYLOADLENGTH: u8 = 0x38;

/// Mode bits of REG_OPMODE kept when switching modes
const OPMODE_KEEP_MASK: u8 = 0xE3;

const OPMODE_SLEEP: u8 = 0x00;
const OPMODE_STANDBY: u8 = 0x04;
const OPMODE_TRANSMITTER: u8 = 0x0C;
const OPMODE_RECEIVER: u8 = 0x10;

const IRQFLAGS2_PAYLOADREADY: u8 = 0x04;
const IRQFLAGS2_PACKETSENT: u8 = 0x08;

/// Writing this flag to IRQFLAGS2 flushes the FIFO
const IRQFLAGS2_FIFOOVERRUN: u8 = 0x10;

/// Crystal oscillator, Hz
const FXOSC: u32 = 32_000_000;

/// Read bit cleared, write bit set on the address byte
const WRITE_FLAG: u8 = 0x80;

pub(crate) fn read_reg<B: SpiBus + ?Sized>(bus: &mut B, addr: u8) -> u8 {
    let mut buf = [addr & !WRITE_FLAG, 0x00];
    if let Err(e) = bus.transfer(&mut buf) {
        warn!("RFM69 read_register 0x{:02X} failed: {}", addr, e);
        return 0;
    }
    buf[1]
}

pub(crate) fn write_reg<B: SpiBus + ?Sized>(bus: &mut B, addr: u8, value: u8) {
    let mut buf = [addr | WRITE_FLAG, value];
    if let Err(e) = bus.transfer(&mut buf) {
        warn!("RFM69 write_register 0x{:02X} failed: {}", addr, e);
    }
}

/// Bit rate divider for REG_BITRATEMSB/LSB
pub fn bitrate_divider(bps: u32) -> u16 {
    let bps = bps.max(1);
    ((FXOSC + bps / 2) / bps).min(u32::from(u16::MAX)) as u16
}

/// Carrier frequency word for REG_FRFMSB..LSB, 24 bits
pub fn frequency_word(khz: u32) -> u32 {
    let hz = u64::from(khz) * 1000;
    (((hz << 2) / u64::from(FXOSC >> 11)) << 6) as u32 & 0x00FF_FFFF
}

/// RFM69 transceiver on an SPI bus
pub struct Rfm69<B: SpiBus> {
    bus: B,
    data_rate: u32,
    frequency_khz: u32,
}

impl<B: SpiBus> Rfm69<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            data_rate: DEFAULT_DATA_RATE,
            frequency_khz: DEFAULT_FREQUENCY_KHZ,
        }
    }

    /// Carrier frequency last set, kHz
    pub fn frequency(&self) -> u32 {
        self.frequency_khz
    }

    /// Drop whatever is left in the FIFO
    pub fn clear_fifo(&mut self) {
        self.write_register(REG_IRQFLAGS2, IRQFLAGS2_FIFOOVERRUN);
    }

    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: SpiBus> Radio for Rfm69<B> {
    fn read_register(&mut self, addr: u8) -> u8 {
        read_reg(&mut self.bus, addr)
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        write_reg(&mut self.bus, addr, value)
    }

    fn read_fifo_byte(&mut self) -> u8 {
        self.read_register(REG_FIFO)
    }

    fn write_fifo_byte(&mut self, byte: u8) {
        self.write_register(REG_FIFO, byte)
    }

    fn set_mode(&mut self, mode: RadioMode) {
        let bits = match mode {
            RadioMode::Sleep => OPMODE_SLEEP,
            RadioMode::Idle => OPMODE_STANDBY,
            RadioMode::Receive => OPMODE_RECEIVER,
            RadioMode::Transmit => OPMODE_TRANSMITTER,
        };

        let opmode = self.read_register(REG_OPMODE);
        self.write_register(REG_OPMODE, (opmode & OPMODE_KEEP_MASK) | bits);

        if mode == RadioMode::Idle {
            self.clear_fifo();
        }
        trace!("RFM69 mode {:?}", mode);
    }

    fn set_frequency(&mut self, khz: u32) {
        self.frequency_khz = khz;
        let word = frequency_word(khz);
        self.write_register(REG_FRFMSB, (word >> 16) as u8);
        self.write_register(REG_FRFMID, (word >> 8) as u8);
        self.write_register(REG_FRFLSB, word as u8);
    }

    fn set_data_rate(&mut self, bps: u32) {
        self.data_rate = bps;
        let [msb, lsb] = bitrate_divider(bps).to_be_bytes();
        self.write_register(REG_BITRATEMSB, msb);
        self.write_register(REG_BITRATELSB, lsb);
    }

    fn data_rate(&self) -> u32 {
        self.data_rate
    }

    fn payload_ready(&mut self) -> bool {
        self.read_register(REG_IRQFLAGS2) & IRQFLAGS2_PAYLOADREADY != 0
    }

    fn packet_sent(&mut self) -> bool {
        self.read_register(REG_IRQFLAGS2) & IRQFLAGS2_PACKETSENT != 0
    }

    fn framing_mode(&self) -> FramingMode {
        FramingMode::Packetized
    }
}
