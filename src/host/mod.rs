//! # Host Link Module
//!
//! Delivers output lines to the host system.
//!
//! This module handles:
//! - Opening the host serial port (8N1, configurable baud rate)
//! - Falling back to stdout when no port is configured
//! - Terminating every line with `\r\n` and flushing it

pub mod port_trait;

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::OutputConfig;
use crate::error::{GatewayError, Result};
use port_trait::{HostPortIO, StdoutPort, TokioSerialPort};

/// Line terminator expected by the host software
pub const LINE_ENDING: &str = "\r\n";

/// Sink for output lines
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostLink: Send {
    /// Write one line followed by [`LINE_ENDING`]
    async fn send_line(&mut self, line: &str) -> Result<()>;

    /// Human-readable name of the sink
    fn name(&self) -> &str;
}

/// Line-oriented host link over any [`HostPortIO`]
pub struct LineWriter<P: HostPortIO> {
    port: P,
    name: String,
}

impl<P: HostPortIO> std::fmt::Debug for LineWriter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineWriter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<P: HostPortIO> LineWriter<P> {
    pub fn new(port: P, name: impl Into<String>) -> Self {
        Self {
            port,
            name: name.into(),
        }
    }
}

#[async_trait]
impl<P: HostPortIO> HostLink for LineWriter<P> {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + LINE_ENDING.len());
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(LINE_ENDING.as_bytes());

        self.port
            .write_all(&data)
            .await
            .map_err(|e| GatewayError::Serial(format!("Failed to write line: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| GatewayError::Serial(format!("Failed to flush {}: {}", self.name, e)))?;

        debug!("Sent line to {}: {}", self.name, line);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Open a host serial port with 8N1 settings
fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| GatewayError::Serial(format!("Failed to open {}: {}", path, e)))?;

    Ok(port)
}

/// Open the serial host link at `path`
///
/// # Errors
///
/// Returns `HostPortNotFound` when the port cannot be opened
pub fn open_serial(path: &str, baud_rate: u32) -> Result<LineWriter<TokioSerialPort>> {
    match open_port(path, baud_rate) {
        Ok(port) => {
            info!("Opened host port {} at {} baud", path, baud_rate);
            Ok(LineWriter::new(TokioSerialPort::new(port), path))
        }
        Err(e) => {
            warn!("{}", e);
            Err(GatewayError::HostPortNotFound(path.to_string()))
        }
    }
}

/// Host link writing to stdout
pub fn open_stdout() -> LineWriter<StdoutPort> {
    LineWriter::new(StdoutPort::new(), "stdout")
}

/// Open the host link described by `config`
///
/// An empty port writes to stdout.
pub fn open(config: &OutputConfig) -> Result<Box<dyn HostLink>> {
    if config.port.is_empty() {
        info!("Writing host lines to stdout");
        return Ok(Box::new(open_stdout()));
    }
    Ok(Box::new(open_serial(&config.port, config.baud_rate)?))
}
