//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GatewayError, Result};
use crate::radio::{ALTERNATE_DATA_RATE, DEFAULT_DATA_RATE, DEFAULT_FREQUENCY_KHZ};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub radio: RadioConfig,

    #[serde(default)]
    pub receiver: ReceiverConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub transmitter: TransmitterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Radio configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    /// JSON Lines capture replayed by the gateway
    #[serde(default)]
    pub capture_file: PathBuf,

    #[serde(default = "default_frequency_khz")]
    pub frequency_khz: u32,

    #[serde(default = "default_data_rate")]
    pub data_rate: u32,

    /// Seconds between data-rate switches, 0 disables toggling
    #[serde(default)]
    pub toggle_interval_s: u64,

    #[serde(default = "default_alternate_data_rate")]
    pub alternate_data_rate: u32,
}

/// Receiver configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReceiverConfig {
    /// Log every rejected frame
    #[serde(default)]
    pub debug: bool,
}

/// Host line format
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `OK ...` lines for home automation hosts
    #[default]
    Compact,
    /// Raw bytes and every decoded field
    Debug,
}

/// Host output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Serial device for the host link, empty writes to stdout
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Periodic LaCrosse transmitter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TransmitterConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub id: u8,

    #[serde(default = "default_transmit_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_data_rate")]
    pub data_rate: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_humidity")]
    pub humidity: u8,

    #[serde(default)]
    pub new_battery_flag: bool,

    /// Seconds after start at which the new-battery flag is cleared
    #[serde(default)]
    pub new_battery_reset_s: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Daily-rotated log file, empty logs to stderr only
    #[serde(default)]
    pub file: String,
}

// Default value functions
fn default_frequency_khz() -> u32 { DEFAULT_FREQUENCY_KHZ }
fn default_data_rate() -> u32 { DEFAULT_DATA_RATE }
fn default_alternate_data_rate() -> u32 { ALTERNATE_DATA_RATE }

fn default_baud_rate() -> u32 { 57600 }

fn default_transmit_interval_ms() -> u64 { 4000 }
fn default_temperature() -> f32 { 20.0 }
fn default_humidity() -> u8 { 50 }

fn default_log_level() -> String { "info".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            id: 0,
            interval_ms: default_transmit_interval_ms(),
            data_rate: default_data_rate(),
            temperature: default_temperature(),
            humidity: default_humidity(),
            new_battery_flag: false,
            new_battery_reset_s: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> GatewayError {
    GatewayError::Config(toml::de::Error::custom(message))
}

fn check_data_rate(name: &str, bps: u32) -> Result<()> {
    if !(1200..=300_000).contains(&bps) {
        return Err(invalid(format!("{} must be between 1200 and 300000", name)));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lacrosse_gateway::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Radio
        if self.radio.capture_file.as_os_str().is_empty() {
            return Err(invalid("radio capture_file cannot be empty"));
        }

        if !(860_000..=1_020_000).contains(&self.radio.frequency_khz) {
            return Err(invalid("frequency_khz must be between 860000 and 1020000"));
        }

        check_data_rate("data_rate", self.radio.data_rate)?;
        check_data_rate("alternate_data_rate", self.radio.alternate_data_rate)?;

        // Host link
        if ![9600, 19200, 38400, 57600, 115200].contains(&self.output.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200",
            ));
        }

        // Transmitter, checked even when disabled so a later enable cannot fail
        let tx = &self.transmitter;
        if tx.id > 63 {
            return Err(invalid("transmitter id must be between 0 and 63"));
        }

        if tx.interval_ms < 1000 {
            return Err(invalid("transmitter interval_ms must be at least 1000"));
        }

        check_data_rate("transmitter data_rate", tx.data_rate)?;

        if !(-40.0..60.0).contains(&tx.temperature) {
            return Err(invalid("transmitter temperature must be between -40 and 60"));
        }

        if tx.humidity > 99 {
            return Err(invalid("transmitter humidity must be between 0 and 99"));
        }

        // Logging
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "logging level must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config {
            radio: RadioConfig {
                capture_file: PathBuf::from("capture.jsonl"),
                frequency_khz: default_frequency_khz(),
                data_rate: default_data_rate(),
                toggle_interval_s: 0,
                alternate_data_rate: default_alternate_data_rate(),
            },
            receiver: ReceiverConfig::default(),
            output: OutputConfig::default(),
            transmitter: TransmitterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn load_str(toml_content: &str) -> Result<Config> {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        Config::load(temp_file.path())
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_minimal_file() {
        let config = load_str(
            r#"
[radio]
capture_file = "captures/garden.jsonl"
"#,
        )
        .unwrap();

        assert_eq!(config.radio.frequency_khz, 868_300);
        assert_eq!(config.radio.data_rate, 17_241);
        assert_eq!(config.radio.alternate_data_rate, 9_579);
        assert_eq!(config.radio.toggle_interval_s, 0);
        assert!(!config.receiver.debug);
        assert_eq!(config.output.format, OutputFormat::Compact);
        assert!(config.output.port.is_empty());
        assert_eq!(config.output.baud_rate, 57600);
        assert!(!config.transmitter.enabled);
        assert_eq!(config.transmitter.interval_ms, 4000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_full_file() {
        let config = load_str(
            r#"
[radio]
capture_file = "capture.jsonl"
frequency_khz = 869000
toggle_interval_s = 30

[receiver]
debug = true

[output]
format = "debug"
port = "/dev/ttyUSB0"
baud_rate = 115200

[transmitter]
enabled = true
id = 42
interval_ms = 10000
temperature = -3.5
humidity = 80
new_battery_flag = true
new_battery_reset_s = 3600

[logging]
level = "debug"
file = "gateway.log"
"#,
        )
        .unwrap();

        assert_eq!(config.radio.frequency_khz, 869_000);
        assert_eq!(config.radio.toggle_interval_s, 30);
        assert!(config.receiver.debug);
        assert_eq!(config.output.format, OutputFormat::Debug);
        assert_eq!(config.output.baud_rate, 115200);
        assert_eq!(config.transmitter.id, 42);
        assert_eq!(config.transmitter.temperature, -3.5);
        assert_eq!(config.transmitter.new_battery_reset_s, 3600);
        assert_eq!(config.logging.file, "gateway.log");
    }

    #[test]
    fn test_shipped_default_config() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")).unwrap();
        assert_eq!(config.radio.capture_file, PathBuf::from("demos/capture.jsonl"));
        assert_eq!(config.output.format, OutputFormat::Compact);
    }

    #[test]
    fn test_missing_radio_section() {
        let result = load_str("[receiver]\ndebug = true\n");
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_unknown_format() {
        let result = load_str("[radio]\ncapture_file = \"c.jsonl\"\n[output]\nformat = \"xml\"\n");
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/gateway.toml");
        assert!(matches!(result, Err(GatewayError::Io(_))));
    }

    #[test]
    fn test_empty_capture_file() {
        let mut config = create_valid_config();
        config.radio.capture_file = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_frequency() {
        let mut config = create_valid_config();
        config.radio.frequency_khz = 433_920;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_data_rates() {
        let mut config = create_valid_config();
        config.radio.data_rate = 600;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.radio.alternate_data_rate = 400_000;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.transmitter.data_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.output.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_transmitter() {
        let mut config = create_valid_config();
        config.transmitter.id = 64;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.transmitter.interval_ms = 999;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.transmitter.temperature = 60.0;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.transmitter.humidity = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
