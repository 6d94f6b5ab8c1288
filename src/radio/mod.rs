//! # Radio Hardware Abstraction
//!
//! The [`Radio`] trait is everything the receiver and the transmit path need
//! from a transceiver. Two chip adapters sit on top of a raw [`SpiBus`]:
//!
//! - [`Rfm69`]: register addressed, delivers fixed 64-byte payloads
//! - [`Rfm12b`]: 16-bit command words, delivers one byte at a time
//!
//! [`ReplayRadio`] plays back a recorded capture for hosts without a
//! transceiver attached.

pub mod replay;
pub mod rfm12b;
pub mod rfm69;

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;
use std::io;

use tracing::debug;

pub use replay::ReplayRadio;
pub use rfm12b::Rfm12b;
pub use rfm69::Rfm69;

/// Default carrier frequency, kHz
pub const DEFAULT_FREQUENCY_KHZ: u32 = 868_300;

/// LaCrosse IT+ data rate, bit/s
pub const DEFAULT_DATA_RATE: u32 = 17_241;

/// Data rate of the slower sensor generation (TX38IT, EMT7110), bit/s
pub const ALTERNATE_DATA_RATE: u32 = 9_579;

/// Transceiver operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Sleep,
    Idle,
    Receive,
    Transmit,
}

/// How the chip hands received data to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// Whole payload of [`crate::sensors::MAX_FRAME_LENGTH`] bytes at once
    Packetized,
    /// One byte per ready indication; frame ends are found by the receiver
    Streaming,
}

/// Transceiver interface used by the receiver and transmit path
///
/// All methods are infallible: bus errors are logged by the adapter and
/// surface as zero bytes or "not ready".
pub trait Radio {
    fn read_register(&mut self, addr: u8) -> u8;

    fn write_register(&mut self, addr: u8, value: u8);

    /// Pop one received byte
    fn read_fifo_byte(&mut self) -> u8;

    /// Queue one byte for transmission
    fn write_fifo_byte(&mut self, byte: u8);

    fn set_mode(&mut self, mode: RadioMode);

    fn set_frequency(&mut self, khz: u32);

    fn set_data_rate(&mut self, bps: u32);

    /// Data rate last set, bit/s
    fn data_rate(&self) -> u32;

    /// Received data is waiting in the FIFO
    fn payload_ready(&mut self) -> bool;

    /// The last transmission has left the antenna
    fn packet_sent(&mut self) -> bool;

    fn framing_mode(&self) -> FramingMode;
}

impl<R: Radio + ?Sized> Radio for Box<R> {
    fn read_register(&mut self, addr: u8) -> u8 {
        (**self).read_register(addr)
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        (**self).write_register(addr, value)
    }

    fn read_fifo_byte(&mut self) -> u8 {
        (**self).read_fifo_byte()
    }

    fn write_fifo_byte(&mut self, byte: u8) {
        (**self).write_fifo_byte(byte)
    }

    fn set_mode(&mut self, mode: RadioMode) {
        (**self).set_mode(mode)
    }

    fn set_frequency(&mut self, khz: u32) {
        (**self).set_frequency(khz)
    }

    fn set_data_rate(&mut self, bps: u32) {
        (**self).set_data_rate(bps)
    }

    fn data_rate(&self) -> u32 {
        (**self).data_rate()
    }

    fn payload_ready(&mut self) -> bool {
        (**self).payload_ready()
    }

    fn packet_sent(&mut self) -> bool {
        (**self).packet_sent()
    }

    fn framing_mode(&self) -> FramingMode {
        (**self).framing_mode()
    }
}

/// Raw full-duplex SPI link to a transceiver
///
/// Chip select is asserted for the duration of one `transfer`.
#[cfg_attr(test, mockall::automock)]
pub trait SpiBus {
    /// Clock out `buf` and overwrite it with the bytes clocked in
    fn transfer(&mut self, buf: &mut [u8]) -> io::Result<()>;
}

/// Transceiver families the gateway can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip {
    Rfm69,
    Rfm12b,
}

impl fmt::Display for Chip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chip::Rfm69 => f.write_str("RFM69CW"),
            Chip::Rfm12b => f.write_str("RFM12B"),
        }
    }
}

/// Tell an RFM69 from an RFM12B
///
/// Writes two probe values into the RFM69 payload-length register and reads
/// them back. Only an RFM69 echoes both; an RFM12B interprets the same bytes
/// as harmless commands.
pub fn detect_chip<B: SpiBus + ?Sized>(bus: &mut B) -> Chip {
    let chip = if probe(bus, 0x0A) && probe(bus, 0x40) {
        Chip::Rfm69
    } else {
        Chip::Rfm12b
    };

    debug!("Detected radio: {}", chip);
    chip
}

fn probe<B: SpiBus + ?Sized>(bus: &mut B, value: u8) -> bool {
    rfm69::write_reg(bus, rfm69::REG_PAYLOADLENGTH, value);
    rfm69::read_reg(bus, rfm69::REG_PAYLOADLENGTH) == value
}
