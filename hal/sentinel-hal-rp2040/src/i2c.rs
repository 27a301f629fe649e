//! Two-wire bus with a bounded write and line takeover
//!
//! [`RecoverableI2c`] wraps the embassy async driver; a write is driven to
//! completion on the spot against an `Instant` deadline, so callers see a
//! plain blocking call that cannot hang. The deadline is a clock read, not
//! a `Timer`, since the timer queue rejects wakers that do not belong to
//! an executor task.
//!
//! [`I2cLines`] takes the SDA/SCL pads away from the I2C block by switching
//! their function select to SIO, bit-bangs them, and hands them back.

use embassy_embedded_hal::SetConfig;
use embassy_rp::i2c::{self, Async, I2c, Instance};
use embassy_rp::pac;
use embassy_time::{Duration, Instant};
use embedded_hal::i2c::{Error as _, ErrorKind};
use sentinel_hal::bounded::block_until;
use sentinel_hal::{BusLines, I2cBus, I2cConfig, I2cError};

/// IO_BANK0 function select: I2C
const FUNCSEL_I2C: u8 = 3;
/// IO_BANK0 function select: SIO (software GPIO)
const FUNCSEL_SIO: u8 = 5;

/// Map an `embedded-hal` error kind onto the bus error taxonomy
pub fn bus_error(kind: ErrorKind) -> I2cError {
    match kind {
        ErrorKind::NoAcknowledge(_) => I2cError::Nack,
        ErrorKind::ArbitrationLoss => I2cError::ArbitrationLost,
        ErrorKind::Bus => I2cError::Bus,
        _ => I2cError::Other,
    }
}

/// I2C master with a bounded write
pub struct RecoverableI2c<'d, T: Instance> {
    i2c: I2c<'d, T, Async>,
}

impl<'d, T: Instance> RecoverableI2c<'d, T> {
    pub fn new(i2c: I2c<'d, T, Async>) -> Self {
        Self { i2c }
    }
}

impl<T: Instance> I2cBus for RecoverableI2c<'_, T> {
    fn write_timeout(
        &mut self,
        address: u8,
        data: &[u8],
        timeout_us: u32,
    ) -> Result<usize, I2cError> {
        let deadline = Instant::now() + Duration::from_micros(timeout_us as u64);
        let write = embedded_hal_async::i2c::I2c::write(&mut self.i2c, address, data);

        match block_until(write, || Instant::now() >= deadline) {
            Some(Ok(())) => Ok(data.len()),
            Some(Err(e)) => Err(bus_error(e.kind())),
            None => Err(I2cError::Timeout),
        }
    }

    fn reinit(&mut self, config: &I2cConfig) {
        let mut cfg = i2c::Config::default();
        cfg.frequency = config.frequency;

        if self.i2c.set_config(&cfg).is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("I2C reinit rejected {} Hz", config.frequency);
        }
    }
}

/// Raw control of the SDA/SCL pads by GPIO number
pub struct I2cLines {
    sda: usize,
    scl: usize,
}

impl I2cLines {
    /// Lines for the given pads
    ///
    /// The pads must be the ones the I2C peripheral was created with; the
    /// peripheral keeps ownership and this only flips their function select
    /// during recovery.
    pub fn new(sda: u8, scl: u8) -> Self {
        Self {
            sda: sda as usize,
            scl: scl as usize,
        }
    }

    fn mask(pin: usize) -> u32 {
        1 << pin
    }

    fn set_funcsel(pin: usize, funcsel: u8) {
        pac::IO_BANK0
            .gpio(pin)
            .ctrl()
            .write(|w| w.set_funcsel(funcsel));
    }

    fn enable_pull_up(pin: usize) {
        pac::PADS_BANK0.gpio(pin).modify(|w| {
            w.set_ie(true);
            w.set_od(false);
            w.set_pue(true);
            w.set_pde(false);
        });
    }
}

impl BusLines for I2cLines {
    fn take_lines(&mut self) {
        let sio = pac::SIO;

        // SCL idles high before it becomes an output
        sio.gpio_out(0).value_set().write_value(Self::mask(self.scl));
        sio.gpio_oe(0).value_set().write_value(Self::mask(self.scl));
        sio.gpio_oe(0).value_clr().write_value(Self::mask(self.sda));

        Self::enable_pull_up(self.sda);
        Self::enable_pull_up(self.scl);
        Self::set_funcsel(self.sda, FUNCSEL_SIO);
        Self::set_funcsel(self.scl, FUNCSEL_SIO);
    }

    fn set_clock(&mut self, high: bool) {
        let out = pac::SIO.gpio_out(0);
        if high {
            out.value_set().write_value(Self::mask(self.scl));
        } else {
            out.value_clr().write_value(Self::mask(self.scl));
        }
    }

    fn data_is_high(&self) -> bool {
        pac::SIO.gpio_in(0).read() & Self::mask(self.sda) != 0
    }

    fn drive_data(&mut self, high: bool) {
        let sio = pac::SIO;
        if high {
            sio.gpio_out(0).value_set().write_value(Self::mask(self.sda));
        } else {
            sio.gpio_out(0).value_clr().write_value(Self::mask(self.sda));
        }
        sio.gpio_oe(0).value_set().write_value(Self::mask(self.sda));
    }

    fn restore_lines(&mut self) {
        let sio = pac::SIO;
        sio.gpio_oe(0)
            .value_clr()
            .write_value(Self::mask(self.sda) | Self::mask(self.scl));

        Self::enable_pull_up(self.sda);
        Self::enable_pull_up(self.scl);
        Self::set_funcsel(self.sda, FUNCSEL_I2C);
        Self::set_funcsel(self.scl, FUNCSEL_I2C);
    }
}
