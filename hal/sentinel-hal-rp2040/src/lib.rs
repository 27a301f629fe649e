//! RP2040-specific HAL for the Sentinel monitor firmware
//!
//! This crate provides RP2040 implementations of the `sentinel-hal`
//! traits on top of `embassy-rp`:
//!
//! - Bounded two-wire writes and bit-level line takeover for recovery
//! - Circular DMA receive ring and one-shot DMA transmit for a UART
//! - UART port registers, DREQs and error mapping
//! - Status LED output

#![no_std]

pub mod dma;
pub mod gpio;
pub mod i2c;
pub mod uart;

pub use dma::{OneShotTx, RingRx};
pub use gpio::Led;
pub use i2c::{I2cLines, RecoverableI2c};
pub use uart::UartPort;
