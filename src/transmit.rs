//! # Transmit Path
//!
//! Sends encoded frames through the radio and runs the periodic LaCrosse
//! transmit schedule.
//!
//! A transmission temporarily switches the radio to the requested data
//! rate, waits for the packet-sent flag and then restores the previous data
//! rate and receive mode, so it never overlaps with reception.

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::TransmitterConfig;
use crate::radio::{Radio, RadioMode};
use crate::sensors::{lacrosse, Frame, LaCrosseFrame};

/// Longest wait for the packet-sent flag
pub const SEND_TIMEOUT_MS: u64 = 500;

/// Send raw bytes at `data_rate`
///
/// Returns `false` when the radio did not report completion within
/// [`SEND_TIMEOUT_MS`]. The radio is back in receive mode at the previous
/// data rate either way.
pub fn send_frame<R, C>(radio: &mut R, clock: &C, bytes: &[u8], data_rate: u32) -> bool
where
    R: Radio + ?Sized,
    C: Clock + ?Sized,
{
    let previous_rate = radio.data_rate();

    radio.set_mode(RadioMode::Idle);
    radio.set_data_rate(data_rate);
    for &byte in bytes {
        radio.write_fifo_byte(byte);
    }
    radio.set_mode(RadioMode::Transmit);

    let start = clock.now_ms();
    let mut sent = radio.packet_sent();
    while !sent && clock.now_ms().saturating_sub(start) < SEND_TIMEOUT_MS {
        sent = radio.packet_sent();
    }

    radio.set_mode(RadioMode::Idle);
    radio.set_data_rate(previous_rate);
    radio.set_mode(RadioMode::Receive);

    if sent {
        debug!("Sent {:02X?} at {} bit/s", bytes, data_rate);
    } else {
        warn!("Transmission of {} bytes timed out", bytes.len());
    }
    sent
}

/// Encode `frame` with its own protocol and send it
///
/// Returns `false` without touching the radio when the protocol cannot be
/// transmitted.
pub fn send<R, C>(radio: &mut R, clock: &C, frame: &Frame, data_rate: u32) -> bool
where
    R: Radio + ?Sized,
    C: Clock + ?Sized,
{
    match frame.protocol().encode(frame) {
        Some(bytes) => send_frame(radio, clock, &bytes, data_rate),
        None => {
            warn!("{} frames cannot be transmitted", frame.protocol());
            false
        }
    }
}

/// Periodic LaCrosse sender emulating a thermo/hygro sensor
#[derive(Debug, Clone, PartialEq)]
pub struct Transmitter {
    id: u8,
    interval_ms: u64,
    data_rate: u32,
    new_battery: bool,
    new_battery_reset_ms: u64,
    temperature: f32,
    humidity: u8,
    last_transmit_ms: u64,
}

impl Transmitter {
    pub fn new(id: u8, interval_ms: u64, data_rate: u32) -> Self {
        Self {
            id,
            interval_ms,
            data_rate,
            new_battery: false,
            new_battery_reset_ms: 0,
            temperature: 0.0,
            humidity: 0,
            last_transmit_ms: 0,
        }
    }

    pub fn from_config(config: &TransmitterConfig) -> Self {
        let mut transmitter = Self::new(config.id, config.interval_ms, config.data_rate);
        transmitter.set_new_battery(config.new_battery_flag, config.new_battery_reset_s * 1000);
        transmitter.set_values(config.temperature, config.humidity);
        transmitter
    }

    /// Set the new-battery flag, cleared at the first transmission at or
    /// after `reset_at_ms`
    pub fn set_new_battery(&mut self, flag: bool, reset_at_ms: u64) {
        self.new_battery = flag;
        self.new_battery_reset_ms = reset_at_ms;
    }

    pub fn set_values(&mut self, temperature: f32, humidity: u8) {
        self.temperature = temperature;
        self.humidity = humidity;
    }

    pub fn data_rate(&self) -> u32 {
        self.data_rate
    }

    /// Whether a transmission is due at `now_ms`
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.last_transmit_ms + self.interval_ms
    }

    /// Frame carrying the current values
    pub fn frame(&self) -> LaCrosseFrame {
        let mut frame = LaCrosseFrame::new(self.id, self.temperature, self.humidity);
        frame.new_battery = self.new_battery;
        frame
    }

    /// Transmit if due
    ///
    /// `None` when not due, otherwise whether the radio reported the packet
    /// as sent before the timeout.
    pub fn poll<R, C>(&mut self, radio: &mut R, clock: &C) -> Option<bool>
    where
        R: Radio + ?Sized,
        C: Clock + ?Sized,
    {
        let now = clock.now_ms();
        if !self.is_due(now) {
            return None;
        }
        self.last_transmit_ms = now;

        if self.new_battery && now >= self.new_battery_reset_ms {
            debug!("Clearing new battery flag of sensor {}", self.id);
            self.new_battery = false;
        }

        let bytes = lacrosse::encode(&self.frame());
        Some(send_frame(radio, clock, &bytes, self.data_rate))
    }
}
