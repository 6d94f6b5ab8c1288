//! # Gateway Loop
//!
//! Ties the radio, the frame receiver, the dispatcher and the output
//! encoder together, and runs the optional transmitter and data-rate
//! toggling between receptions.
//!
//! [`Gateway::poll`] is one non-blocking iteration and returns the host
//! lines it produced; [`Gateway::forward`] also writes them to a
//! [`HostLink`].

use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::{Config, OutputFormat};
use crate::dispatch::{first_header_match, DispatchStats, Dispatcher};
use crate::error::Result;
use crate::host::HostLink;
use crate::output::{compact_line, debug_line};
use crate::radio::{FramingMode, Radio, RadioMode};
use crate::receiver::{FrameReceiver, RawFrame};
use crate::transmit::Transmitter;

/// Upper bound of receive attempts per poll, keeps one poll short on a
/// busy streaming radio
const MAX_RECEIVES_PER_POLL: usize = 256;

/// Periodic switch between two data rates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRateToggle {
    rates: [u32; 2],
    interval_ms: u64,
    current: usize,
    last_switch_ms: u64,
}

impl DataRateToggle {
    pub fn new(primary: u32, alternate: u32, interval_ms: u64) -> Self {
        Self {
            rates: [primary, alternate],
            interval_ms,
            current: 0,
            last_switch_ms: 0,
        }
    }

    /// Data rate the radio should be tuned to
    pub fn current(&self) -> u32 {
        self.rates[self.current]
    }

    /// Switch to the other rate when the interval has passed
    ///
    /// Returns the new rate after a switch.
    pub fn poll(&mut self, now_ms: u64) -> Option<u32> {
        if now_ms < self.last_switch_ms + self.interval_ms {
            return None;
        }
        self.last_switch_ms = now_ms;
        self.current ^= 1;
        Some(self.current())
    }
}

/// Gateway counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GatewayStats {
    /// Raw frames after repeat folding
    pub frames: u64,
    /// Lines produced for the host
    pub lines: u64,
    /// Frames the radio reported as sent
    pub transmissions: u64,
    /// Sends abandoned after the packet-sent timeout
    pub transmit_timeouts: u64,
    pub rate_switches: u64,
}

/// The receive/decode/output loop around one radio
pub struct Gateway<R: Radio, C: Clock> {
    radio: R,
    clock: C,
    receiver: FrameReceiver,
    dispatcher: Dispatcher,
    format: OutputFormat,
    transmitter: Option<Transmitter>,
    toggle: Option<DataRateToggle>,
    stats: GatewayStats,
}

impl<R: Radio, C: Clock> Gateway<R, C> {
    /// Tune the radio from `config` and start receiving
    pub fn new(mut radio: R, clock: C, config: &Config) -> Self {
        radio.set_mode(RadioMode::Idle);
        radio.set_frequency(config.radio.frequency_khz);
        radio.set_data_rate(config.radio.data_rate);
        radio.set_mode(RadioMode::Receive);

        let toggle = (config.radio.toggle_interval_s > 0).then(|| {
            DataRateToggle::new(
                config.radio.data_rate,
                config.radio.alternate_data_rate,
                config.radio.toggle_interval_s * 1000,
            )
        });

        let transmitter = config
            .transmitter
            .enabled
            .then(|| Transmitter::from_config(&config.transmitter));

        info!(
            "Gateway listening on {} kHz at {} bit/s ({:?} output)",
            config.radio.frequency_khz, config.radio.data_rate, config.output.format
        );

        Self {
            radio,
            clock,
            receiver: FrameReceiver::new(),
            dispatcher: Dispatcher::new(config.receiver.debug),
            format: config.output.format,
            transmitter,
            toggle,
            stats: GatewayStats::default(),
        }
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    pub fn dispatch_stats(&self) -> &DispatchStats {
        self.dispatcher.stats()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// One loop iteration, returns the lines for the host
    pub fn poll(&mut self) -> Vec<String> {
        let mut lines = Vec::new();

        for _ in 0..MAX_RECEIVES_PER_POLL {
            match self.receiver.receive(&mut self.radio, &self.clock) {
                Some(raw) => {
                    if let Some(line) = self.handle(&raw) {
                        lines.push(line);
                    }
                }
                None if self.radio.framing_mode() == FramingMode::Streaming
                    && self.radio.payload_ready() => {}
                None => break,
            }
        }

        if let Some(transmitter) = self.transmitter.as_mut() {
            match transmitter.poll(&mut self.radio, &self.clock) {
                Some(true) => self.stats.transmissions += 1,
                Some(false) => self.stats.transmit_timeouts += 1,
                None => {}
            }
        }

        if let Some(toggle) = self.toggle.as_mut() {
            if let Some(rate) = toggle.poll(self.clock.now_ms()) {
                debug!("Switching data rate to {} bit/s", rate);
                self.radio.set_mode(RadioMode::Idle);
                self.radio.set_data_rate(rate);
                self.radio.set_mode(RadioMode::Receive);
                self.stats.rate_switches += 1;
            }
        }

        lines
    }

    /// Poll and write the resulting lines to `link`
    pub async fn forward(&mut self, link: &mut dyn HostLink) -> Result<usize> {
        let lines = self.poll();
        for line in &lines {
            link.send_line(line).await?;
        }
        Ok(lines.len())
    }

    /// Decode one raw frame and render it in the configured format
    fn handle(&mut self, raw: &RawFrame) -> Option<String> {
        self.stats.frames += 1;
        let decoded = self.dispatcher.dispatch(raw);

        let line = match self.format {
            OutputFormat::Compact => decoded.as_ref().and_then(compact_line),
            OutputFormat::Debug => {
                // Invalid frames are shown with the first protocol whose header matches
                let frame = decoded.or_else(|| {
                    first_header_match(raw.bytes()).map(|p| p.decode(raw.bytes()))
                })?;
                Some(debug_line(raw.bytes(), raw.repeats, &frame))
            }
        };

        if line.is_some() {
            self.stats.lines += 1;
        }
        line
    }

    /// Log the counters at info level
    pub fn log_stats(&self) {
        let dispatch = self.dispatcher.stats();
        info!(
            "Frames: {}, decoded: {}, unmatched: {}, lines: {}, transmissions: {} ({} timed out)",
            self.stats.frames,
            dispatch.total_decoded(),
            dispatch.unmatched,
            self.stats.lines,
            self.stats.transmissions,
            self.stats.transmit_timeouts
        );
        info!(
            "Rejections: length {}, checksum {}, implausible {}",
            dispatch.length, dispatch.checksum, dispatch.implausible
        );
        for (protocol, count) in &dispatch.decoded {
            info!("  {}: {}", protocol, count);
        }
    }
}
