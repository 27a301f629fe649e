//! Two-wire bus abstractions
//!
//! The bus is split into two capabilities:
//!
//! - [`I2cBus`]: the peripheral, able to perform a master write that gives
//!   up after a bounded time, and to be re-initialised.
//! - [`BusLines`]: bit-level control of the SDA/SCL pads once they have been
//!   detached from the peripheral, used to clock a wedged peer free.

/// Errors reported by a bounded bus write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// The write did not finish before its deadline
    Timeout,
    /// Address or data byte not acknowledged
    Nack,
    /// Misplaced start/stop or other bus-level error
    Bus,
    /// Another master won arbitration
    ArbitrationLost,
    /// Any other peripheral error
    Other,
}

/// Two-wire bus master with a bounded write
pub trait I2cBus {
    /// Write `data` to the device at 7-bit `address`
    ///
    /// Gives up once `timeout_us` microseconds have passed. Returns the
    /// number of bytes written on success.
    fn write_timeout(&mut self, address: u8, data: &[u8], timeout_us: u32)
        -> Result<usize, I2cError>;

    /// Re-initialise the peripheral at the configured clock rate
    fn reinit(&mut self, config: &I2cConfig);
}

/// Bit-level access to the bus pads
///
/// Only valid between [`BusLines::take_lines`] and
/// [`BusLines::restore_lines`]; outside that window the pads belong to the
/// bus peripheral.
pub trait BusLines {
    /// Detach both pads from the peripheral: SDA becomes an input, SCL a
    /// driven output
    fn take_lines(&mut self);

    /// Drive SCL
    fn set_clock(&mut self, high: bool);

    /// Sample SDA
    fn data_is_high(&self) -> bool;

    /// Switch SDA to an output and drive it
    fn drive_data(&mut self, high: bool);

    /// Hand both pads back to the peripheral with pull-ups enabled
    fn restore_lines(&mut self);
}

/// Two-wire bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}
