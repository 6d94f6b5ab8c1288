//! # Output Encoder
//!
//! Renders decoded frames for the host.
//!
//! Two forms are produced:
//! - the compact host line (`OK 9 ...`, `OK WH1080 ...`), one per valid frame
//! - a human-readable debug line with the raw bytes and every decoded field
//!
//! ## Compact line formats
//!
//! ```text
//! OK 9 <id> <type> <T_hi> <T_lo> <hum>          LaCrosse, TX38IT, WT440XH
//! OK WH1080 <id> <T_hi> <T_lo> <hum>
//! OK WS1600 <id> <T_hi> <T_lo> <hum>
//! OK EMT7110 <id_hi> <id_lo> <V*10 hi lo> <mA hi lo> <W hi lo> <kWh*100 hi lo> <flags>
//! OK LS <id> 0 <L*10+1000 hi lo> <T*10+1000 hi lo> <V*10>
//! ```
//!
//! Temperature words are `T * 10 + 1000`. The LaCrosse humidity byte carries
//! the weak-battery flag in bit 7. A WS1600 frame without a temperature
//! data set gives no line; a missing humidity is sent as 106.

use std::fmt::{self, Write};

use crate::sensors::{tx38it, Emt7110Frame, Frame, LaCrosseFrame, LevelSenderFrame, Ws1600Frame};

/// Sensor type for humidity values of a thermo/hygro sensor
const TYPE_THERMO_HYGRO: u8 = 1;

/// Sensor type for the second channel of two-channel sensors
const TYPE_SECOND_CHANNEL: u8 = 130;

/// Added to the sensor type while the new-battery flag is set
const NEW_BATTERY_TYPE_FLAG: u8 = 128;

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    /// Value and number of decimals
    Decimal(f32, usize),
    Flag(bool),
    Hex(u32),
    Text(&'static str),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Decimal(v, decimals) => write!(f, "{:.*}", decimals, v),
            Value::Flag(v) => write!(f, "{}", u8::from(*v)),
            Value::Hex(v) => write!(f, "{:X}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// A named decoded field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub value: Value,
}

impl Field {
    fn new(name: &'static str, value: Value) -> Self {
        Self { name, value }
    }
}

fn int(name: &'static str, value: impl Into<i64>) -> Field {
    Field::new(name, Value::Int(value.into()))
}

fn decimal(name: &'static str, value: f32, decimals: usize) -> Field {
    Field::new(name, Value::Decimal(value, decimals))
}

fn flag(name: &'static str, value: bool) -> Field {
    Field::new(name, Value::Flag(value))
}

fn lacrosse_fields(f: &LaCrosseFrame) -> Vec<Field> {
    vec![
        int("S", f.header),
        int("ID", f.id),
        flag("NewBatt", f.new_battery),
        flag("Bit12", f.bit12),
        decimal("Temp", f.temperature, 1),
        flag("WeakBatt", f.weak_battery),
        int("Hum", f.humidity),
        int("CRC", f.crc),
    ]
}

fn ws1600_fields(f: &Ws1600Frame) -> Vec<Field> {
    let mut fields = vec![
        int("ID", f.id),
        flag("Sync", f.syncing),
        flag("Error", f.sensor_error),
        int("Sets", f.data_sets),
    ];

    if let Some(t) = f.temperature {
        fields.push(decimal("Temp", t, 1));
    }
    if let Some(h) = f.humidity {
        fields.push(int("Hum", h));
    }
    if let Some(r) = f.rain {
        fields.push(int("Rain", r));
    }
    if let (Some(speed), Some(bearing)) = (f.wind_speed, f.wind_bearing()) {
        fields.push(int("Wind", speed));
        fields.push(Field::new("Dir", Value::Text(bearing)));
    }
    if let Some(g) = f.wind_gust {
        fields.push(int("Gust", g));
    }

    fields.push(int("CRC", f.crc));
    fields
}

fn emt7110_fields(f: &Emt7110Frame) -> Vec<Field> {
    vec![
        Field::new("S", Value::Hex(u32::from(u16::from_be_bytes(f.header)))),
        Field::new("ID", Value::Hex(u32::from(f.id))),
        decimal("V", f.voltage, 1),
        int("mA", f.current),
        decimal("W", f.power, 1),
        decimal("kWh", f.energy, 2),
        flag("Con", f.connected),
        flag("Pair", f.pairing),
        int("CRC", f.crc),
    ]
}

fn level_sender_fields(f: &LevelSenderFrame) -> Vec<Field> {
    vec![
        int("S", f.header),
        int("ID", f.id),
        decimal("Level", f.level, 1),
        decimal("Temp", f.temperature, 1),
        decimal("Volt", f.voltage, 1),
        int("CRC", f.crc),
    ]
}

/// Structured list of the decoded fields of `frame`
pub fn fields(frame: &Frame) -> Vec<Field> {
    match frame {
        Frame::LaCrosse(f) | Frame::Wt440xh(f) => lacrosse_fields(f),
        Frame::Tx38It(f) => vec![
            int("ID", f.id),
            flag("NewBatt", f.new_battery),
            flag("WeakBatt", f.weak_battery),
            decimal("Temp", f.temperature, 1),
            int("Misc", f.misc_bits),
            int("CRC", f.crc),
        ],
        Frame::Wh1080(f) => vec![
            int("ID", f.id),
            decimal("Temp", f.temperature, 1),
            int("Hum", f.humidity),
            decimal("Wind", f.wind_speed, 1),
            decimal("Gust", f.wind_gust, 1),
            decimal("Rain", f.rain, 1),
            Field::new("Dir", Value::Text(f.wind_bearing())),
            int("Unknown", f.unknown),
            int("Status", f.status),
            int("CRC", f.crc),
        ],
        Frame::Ws1600(f) => ws1600_fields(f),
        Frame::Emt7110(f) => emt7110_fields(f),
        Frame::LevelSender(f) => level_sender_fields(f),
    }
}

/// Upper-case hex bytes separated by spaces
pub fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02X}", b);
    }
    out
}

/// Diagnostic line: `<Name> [raw] CRC:OK|WRONG #:<repeats> name:value ...`
///
/// Only the bytes the frame occupies are shown.
pub fn debug_line(raw: &[u8], repeats: u8, frame: &Frame) -> String {
    let shown = &raw[..frame.length().min(raw.len())];
    let status = if frame.is_valid() { "OK" } else { "WRONG" };

    let mut line = format!(
        "{} [{}] CRC:{} #:{}",
        frame.protocol().name(),
        hex_bytes(shown),
        status,
        repeats
    );

    for field in fields(frame) {
        let _ = write!(line, " {}:{}", field.name, field.value);
    }
    line
}

/// `T * 10 + 1000` as a 16-bit word
fn temperature_word(temperature: f32) -> u16 {
    (temperature * 10.0 + 1000.0).round().clamp(0.0, f32::from(u16::MAX)) as u16
}

fn push_word(line: &mut String, word: u16) {
    let [hi, lo] = word.to_be_bytes();
    let _ = write!(line, " {} {}", hi, lo);
}

/// Sensor type byte from the humidity value, `None` for unknown values
pub fn sensor_type(humidity: u8, new_battery: bool) -> Option<u8> {
    match humidity {
        0..=99 | 106 | 128..=227 | 234 => Some(if new_battery {
            TYPE_THERMO_HYGRO | NEW_BATTERY_TYPE_FLAG
        } else {
            TYPE_THERMO_HYGRO
        }),
        125 | 253 => Some(TYPE_SECOND_CHANNEL),
        _ => None,
    }
}

fn lacrosse_line(
    id: u8,
    new_battery: bool,
    temperature: f32,
    weak_battery: bool,
    humidity: u8,
) -> Option<String> {
    let sensor_type = sensor_type(humidity, new_battery)?;

    let mut line = format!("OK 9 {} {}", id, sensor_type);
    push_word(&mut line, temperature_word(temperature));

    let hum = if weak_battery { humidity | 0x80 } else { humidity };
    let _ = write!(line, " {}", hum);
    Some(line)
}

fn weather_line(tag: &str, id: u8, temperature: f32, humidity: u8) -> String {
    let mut line = format!("OK {} {}", tag, id);
    push_word(&mut line, temperature_word(temperature));
    let _ = write!(line, " {}", humidity);
    line
}

fn emt7110_line(f: &Emt7110Frame) -> String {
    let mut line = String::from("OK EMT7110");
    push_word(&mut line, f.id);
    push_word(&mut line, (f.voltage * 10.0).round() as u16);
    push_word(&mut line, f.current);
    push_word(&mut line, f.power as u16);
    push_word(&mut line, (f.energy * 100.0).round() as u16);

    let flags = u8::from(f.connected) | (u8::from(f.pairing) << 1);
    let _ = write!(line, " {}", flags);
    line
}

fn level_sender_line(f: &LevelSenderFrame) -> String {
    let mut line = format!("OK LS {} 0", f.id);
    push_word(&mut line, (f.level * 10.0 + 1000.0).round() as u16);
    push_word(&mut line, temperature_word(f.temperature));
    let _ = write!(line, " {}", (f.voltage * 10.0).round() as u8);
    line
}

/// Host line for a valid frame
///
/// Returns `None` for invalid frames and for LaCrosse-family humidity
/// values that map to no sensor type.
pub fn compact_line(frame: &Frame) -> Option<String> {
    if !frame.is_valid() {
        return None;
    }

    match frame {
        Frame::LaCrosse(f) | Frame::Wt440xh(f) => {
            lacrosse_line(f.id, f.new_battery, f.temperature, f.weak_battery, f.humidity)
        }
        Frame::Tx38It(f) => {
            lacrosse_line(f.id, f.new_battery, f.temperature, f.weak_battery, f.humidity)
        }
        Frame::Wh1080(f) => Some(weather_line("WH1080", f.id, f.temperature, f.humidity)),
        // Wind or rain only frames carry no reading for this line
        Frame::Ws1600(f) => f.temperature.map(|t| {
            weather_line("WS1600", f.id, t, f.humidity.unwrap_or(tx38it::NO_HUMIDITY))
        }),
        Frame::Emt7110(f) => Some(emt7110_line(f)),
        Frame::LevelSender(f) => Some(level_sender_line(f)),
    }
}
