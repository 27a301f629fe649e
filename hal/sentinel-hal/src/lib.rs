//! Sentinel Hardware Abstraction Layer
//!
//! This crate defines the raw hardware capabilities the portable Sentinel
//! crates are written against. Chip-specific HALs implement them; the
//! drivers in `sentinel-drivers` only ever see these traits, which is what
//! lets the recovery state machine and the DMA bridge run against mocks on
//! the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (sentinel-firmware)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  sentinel-drivers / sentinel-core       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  sentinel-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ sentinel-hal- │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital output
//! - [`i2c::I2cBus`] - Two-wire bus writes bounded by a timeout
//! - [`i2c::BusLines`] - Bit-level control of the two bus lines for recovery
//! - [`dma::RxCursor`], [`dma::RxTransport`], [`dma::TxTransport`] - DMA transport
//!
//! [`bounded::block_until`] turns an async driver call into a blocking one
//! with a deadline.

#![no_std]
#![deny(unsafe_code)]

pub mod bounded;
pub mod dma;
pub mod gpio;
pub mod i2c;

// Re-export key traits at crate root for convenience
pub use dma::{DmaError, RxCursor, RxTransport, TxTransport};
pub use gpio::OutputPin;
pub use i2c::{BusLines, I2cBus, I2cConfig, I2cError};
