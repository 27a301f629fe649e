//! Driver implementations for the Sentinel monitor
//!
//! Everything here is written against the `sentinel-hal` traits and
//! `embedded-hal` delays, so it runs unchanged on the RP2040 and against
//! mocks on the host:
//!
//! - Bounded bus writes with automatic bit-level recovery
//! - DMA-fed circular ingestion bridge
//! - SSD1306 OLED driver writing through the recovery controller

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod ingest;
pub mod recovery;
pub mod ssd1306;

pub use ingest::DmaIngestBridge;
pub use recovery::{BusRecoveryController, BusTimeout, RecoveryState, SafeWrite};
pub use ssd1306::Ssd1306;
