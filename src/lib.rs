//! # LaCrosse Gateway Library
//!
//! Receive, validate and forward 868 MHz weather and energy sensor frames.
//!
//! This library provides the frame receiver with repeat folding, the
//! checksum engines, the sensor codecs with their dispatcher, the host line
//! encoder and the transmit path, on top of an abstract radio.

pub mod checksum;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod host;
pub mod output;
pub mod radio;
pub mod receiver;
pub mod sensors;
pub mod transmit;
