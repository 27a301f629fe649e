//! Board-agnostic core logic for the Sentinel monitor firmware
//!
//! This crate contains the pieces that do not touch hardware at all:
//!
//! - Lock-free single-producer/single-consumer byte ring
//! - Board configuration types and their validation
//! - Supply voltage threshold monitoring
//! - The shared error taxonomy

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod monitor;
pub mod ring_buffer;

pub use config::{BufferConfig, BusConfig, MonitorConfig, SentinelConfig, SerialConfig};
pub use error::{BufferError, ConfigError};
pub use monitor::{SupplyStatus, VoltageMonitor};
pub use ring_buffer::{Consumer, Producer, RingBuffer};
