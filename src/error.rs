//! # Error Types
//!
//! Custom error types for the gateway using `thiserror`.
//!
//! The decode path never fails: codecs always return a frame carrying an
//! `is_valid` flag. These errors cover the fallible surroundings only
//! (configuration, host link, capture files).

use thiserror::Error;

/// Main error type for the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the configured host ports could be opened
    #[error("No host serial port found (tried: {0})")]
    HostPortNotFound(String),

    /// Malformed line in a radio capture file
    #[error("Capture line {line}: {reason}")]
    Capture { line: usize, reason: String },
}

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;
