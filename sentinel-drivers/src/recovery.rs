//! Bounded bus writes with automatic recovery
//!
//! A peer that loses track of the clock (a reset mid-transfer, a glitch on
//! SCL) can sit on SDA waiting to shift out the rest of a byte. The
//! peripheral then sees a busy bus forever and every write times out.
//!
//! [`BusRecoveryController::safe_write`] bounds each write and, on any
//! failure, runs the recovery sequence before reporting [`BusTimeout`]:
//!
//! ```text
//!  Idle ──take lines──▶ PulseClock(1) ──▶ … ──▶ PulseClock(n) ──▶ GenerateStop ──▶ Reinit ──▶ Idle
//!                          │  SCL low, SCL high, sample SDA
//!                          └─ SDA high or n == max ─▶ GenerateStop
//! ```
//!
//! Recovery is bounded (at most nine pulses plus a fixed stop sequence) and
//! optimistic: it always returns to `Idle` and never checks whether the peer
//! actually let go. The next write is the check.

use embedded_hal::delay::DelayNs;
use sentinel_core::config::BusConfig;
use sentinel_hal::{BusLines, I2cBus, I2cConfig, I2cError};

/// A write failed and the bus was recovered
///
/// Carries the error the peripheral reported. The original write is not
/// retried; the caller may try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusTimeout {
    pub cause: I2cError,
}

/// Recovery state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecoveryState {
    /// Lines belong to the peripheral
    Idle,
    /// About to issue clock pulse `n` (1-based)
    PulseClock(u8),
    /// Synthesising a stop condition
    GenerateStop,
    /// Handing the lines back and re-initialising the peripheral
    Reinit,
}

/// Anything that can perform a bounded, self-healing write
///
/// Implemented by [`BusRecoveryController`]; display drivers are written
/// against this so they can be tested without a bus.
pub trait SafeWrite {
    /// Write `data` to `address`, recovering the bus on failure
    fn safe_write(&mut self, address: u8, data: &[u8]) -> Result<usize, BusTimeout>;
}

/// Bus master wrapper that recovers a wedged bus
pub struct BusRecoveryController<B, L, D> {
    bus: B,
    lines: L,
    delay: D,
    config: BusConfig,
    state: RecoveryState,
}

impl<B, L, D> BusRecoveryController<B, L, D>
where
    B: I2cBus,
    L: BusLines,
    D: DelayNs,
{
    /// Wrap an initialised peripheral and its pads
    pub fn new(bus: B, lines: L, delay: D, config: BusConfig) -> Self {
        Self {
            bus,
            lines,
            delay,
            config,
            state: RecoveryState::Idle,
        }
    }

    /// Write with the configured timeout
    ///
    /// On success returns the number of bytes written. On any failure runs
    /// [`recover`](Self::recover) and returns [`BusTimeout`].
    pub fn safe_write(&mut self, address: u8, data: &[u8]) -> Result<usize, BusTimeout> {
        match self
            .bus
            .write_timeout(address, data, self.config.write_timeout_us)
        {
            Ok(n) => Ok(n),
            Err(cause) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("bus write to {=u8:#x} failed: {}, recovering", address, cause);

                self.recover();
                Err(BusTimeout { cause })
            }
        }
    }

    /// Write to the configured device address
    pub fn write(&mut self, data: &[u8]) -> Result<usize, BusTimeout> {
        self.safe_write(self.config.address, data)
    }

    /// Run the full recovery sequence
    ///
    /// Always ends in [`RecoveryState::Idle`] with the peripheral
    /// re-initialised. Reports nothing about whether the peer released SDA.
    pub fn recover(&mut self) {
        self.begin();
        while self.state != RecoveryState::Idle {
            self.step();
        }
    }

    /// Take the lines and arm the first clock pulse
    ///
    /// Does nothing unless the machine is idle.
    pub fn begin(&mut self) {
        if self.state != RecoveryState::Idle {
            return;
        }
        self.lines.take_lines();
        self.state = RecoveryState::PulseClock(1);
    }

    /// Execute the current state and move to the next one
    ///
    /// Returns the new state. Stepping while idle is a no-op.
    pub fn step(&mut self) -> RecoveryState {
        let half_period = self.config.pulse_width_us;

        self.state = match self.state {
            RecoveryState::Idle => RecoveryState::Idle,

            RecoveryState::PulseClock(n) => {
                self.lines.set_clock(false);
                self.delay.delay_us(half_period);
                self.lines.set_clock(true);
                self.delay.delay_us(half_period);

                if self.lines.data_is_high() {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("SDA released after {} pulses", n);
                    RecoveryState::GenerateStop
                } else if n >= self.config.recovery_pulses() {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("SDA still held after {} pulses", n);
                    RecoveryState::GenerateStop
                } else {
                    RecoveryState::PulseClock(n + 1)
                }
            }

            RecoveryState::GenerateStop => {
                // SDA rising while SCL is high
                self.lines.drive_data(false);
                self.delay.delay_us(half_period);
                self.lines.set_clock(true);
                self.delay.delay_us(half_period);
                self.lines.drive_data(true);
                self.delay.delay_us(half_period);
                RecoveryState::Reinit
            }

            RecoveryState::Reinit => {
                self.lines.restore_lines();
                self.bus.reinit(&I2cConfig {
                    frequency: self.config.frequency_hz,
                });
                RecoveryState::Idle
            }
        };

        self.state
    }

    /// Current state machine position
    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// Bus configuration in use
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Release the wrapped parts
    pub fn free(self) -> (B, L, D) {
        (self.bus, self.lines, self.delay)
    }
}

impl<B, L, D> SafeWrite for BusRecoveryController<B, L, D>
where
    B: I2cBus,
    L: BusLines,
    D: DelayNs,
{
    fn safe_write(&mut self, address: u8, data: &[u8]) -> Result<usize, BusTimeout> {
        BusRecoveryController::safe_write(self, address, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Write(u8, usize, u32),
        TakeLines,
        Clock(bool),
        SampleData(bool),
        Data(bool),
        RestoreLines,
        Reinit(u32),
        Delay(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    /// Peripheral that fails the first `failures` writes
    struct MockBus {
        log: Log,
        failures: usize,
        error: I2cError,
    }

    impl I2cBus for MockBus {
        fn write_timeout(
            &mut self,
            address: u8,
            data: &[u8],
            timeout_us: u32,
        ) -> Result<usize, I2cError> {
            self.log
                .borrow_mut()
                .push(Event::Write(address, data.len(), timeout_us));
            if self.failures > 0 {
                self.failures -= 1;
                return Err(self.error);
            }
            Ok(data.len())
        }

        fn reinit(&mut self, config: &I2cConfig) {
            self.log.borrow_mut().push(Event::Reinit(config.frequency));
        }
    }

    /// Pads with a peer that lets go of SDA after `release_after` rising
    /// clock edges (`None` = never)
    struct MockLines {
        log: Log,
        release_after: Option<u8>,
        rising_edges: u8,
        clock_high: bool,
    }

    impl BusLines for MockLines {
        fn take_lines(&mut self) {
            self.log.borrow_mut().push(Event::TakeLines);
        }

        fn set_clock(&mut self, high: bool) {
            if high && !self.clock_high {
                self.rising_edges += 1;
            }
            self.clock_high = high;
            self.log.borrow_mut().push(Event::Clock(high));
        }

        fn data_is_high(&self) -> bool {
            let high = match self.release_after {
                Some(k) => self.rising_edges >= k,
                None => false,
            };
            self.log.borrow_mut().push(Event::SampleData(high));
            high
        }

        fn drive_data(&mut self, high: bool) {
            self.log.borrow_mut().push(Event::Data(high));
        }

        fn restore_lines(&mut self) {
            self.log.borrow_mut().push(Event::RestoreLines);
        }
    }

    struct MockDelay {
        log: Log,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.log.borrow_mut().push(Event::Delay(ns / 1000));
        }

        fn delay_us(&mut self, us: u32) {
            self.log.borrow_mut().push(Event::Delay(us));
        }
    }

    fn controller(
        failures: usize,
        release_after: Option<u8>,
    ) -> (BusRecoveryController<MockBus, MockLines, MockDelay>, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let bus = MockBus {
            log: log.clone(),
            failures,
            error: I2cError::Timeout,
        };
        let lines = MockLines {
            log: log.clone(),
            release_after,
            rising_edges: 0,
            clock_high: true,
        };
        let delay = MockDelay { log: log.clone() };
        (
            BusRecoveryController::new(bus, lines, delay, BusConfig::DEFAULT),
            log,
        )
    }

    fn count(log: &Log, event: Event) -> usize {
        log.borrow().iter().filter(|e| **e == event).count()
    }

    fn pulses(log: &Log) -> usize {
        count(log, Event::Clock(false))
    }

    #[test]
    fn test_successful_write_does_not_recover() {
        let (mut ctl, log) = controller(0, None);

        assert_eq!(ctl.safe_write(0x3C, &[0x00, 0xAF]), Ok(2));
        assert_eq!(ctl.state(), RecoveryState::Idle);
        assert_eq!(*log.borrow(), [Event::Write(0x3C, 2, 50_000)]);
    }

    #[test]
    fn test_failed_write_returns_timeout_and_recovers() {
        let (mut ctl, log) = controller(1, Some(1));

        assert_eq!(
            ctl.safe_write(0x3C, &[0x40, 1, 2, 3]),
            Err(BusTimeout {
                cause: I2cError::Timeout
            })
        );
        assert_eq!(ctl.state(), RecoveryState::Idle);
        assert_eq!(count(&log, Event::TakeLines), 1);
        assert_eq!(count(&log, Event::Reinit(400_000)), 1);

        // The original write is not retried
        assert_eq!(count(&log, Event::Write(0x3C, 4, 50_000)), 1);

        // Next write goes through on the recovered bus
        assert_eq!(ctl.write(&[0x00]), Ok(1));
    }

    #[test]
    fn test_any_bus_error_triggers_recovery() {
        let (mut ctl, log) = controller(1, Some(1));
        ctl.bus.error = I2cError::Nack;

        assert_eq!(
            ctl.safe_write(0x3D, &[0]),
            Err(BusTimeout {
                cause: I2cError::Nack
            })
        );
        assert_eq!(count(&log, Event::RestoreLines), 1);
    }

    #[test]
    fn test_recovery_stops_when_data_released() {
        for k in 1..9u8 {
            let (mut ctl, log) = controller(0, Some(k));
            ctl.recover();

            assert_eq!(pulses(&log), k as usize, "released after {}", k);
            assert_eq!(count(&log, Event::Data(false)), 1);
            assert_eq!(count(&log, Event::Data(true)), 1);
            assert_eq!(count(&log, Event::Reinit(400_000)), 1);
            assert_eq!(ctl.state(), RecoveryState::Idle);
        }
    }

    #[test]
    fn test_recovery_bounded_at_nine_pulses() {
        let (mut ctl, log) = controller(0, None);
        ctl.recover();

        assert_eq!(pulses(&log), 9);
        assert_eq!(count(&log, Event::SampleData(false)), 9);
        // Stop sequence and reinit still happen with the peer stuck
        assert_eq!(count(&log, Event::Data(true)), 1);
        assert_eq!(count(&log, Event::Reinit(400_000)), 1);
        assert_eq!(ctl.state(), RecoveryState::Idle);
    }

    #[test]
    fn test_configured_pulse_count_is_respected() {
        let (ctl, log) = controller(0, None);
        let (bus, lines, delay) = ctl.free();
        let mut config = BusConfig::DEFAULT;
        config.max_pulses = 3;
        let mut ctl = BusRecoveryController::new(bus, lines, delay, config);

        ctl.recover();
        assert_eq!(pulses(&log), 3);
    }

    #[test]
    fn test_pulse_samples_after_rising_edge() {
        let (mut ctl, log) = controller(0, Some(1));
        ctl.begin();
        log.borrow_mut().clear();

        assert_eq!(ctl.step(), RecoveryState::GenerateStop);
        assert_eq!(
            *log.borrow(),
            [
                Event::Clock(false),
                Event::Delay(10),
                Event::Clock(true),
                Event::Delay(10),
                Event::SampleData(true),
            ]
        );
    }

    #[test]
    fn test_stop_condition_sequence() {
        let (mut ctl, log) = controller(0, Some(2));
        ctl.begin();
        assert_eq!(ctl.step(), RecoveryState::PulseClock(2));
        assert_eq!(ctl.step(), RecoveryState::GenerateStop);
        log.borrow_mut().clear();

        assert_eq!(ctl.step(), RecoveryState::Reinit);
        assert_eq!(
            *log.borrow(),
            [
                Event::Data(false),
                Event::Delay(10),
                Event::Clock(true),
                Event::Delay(10),
                Event::Data(true),
                Event::Delay(10),
            ]
        );

        log.borrow_mut().clear();
        assert_eq!(ctl.step(), RecoveryState::Idle);
        assert_eq!(
            *log.borrow(),
            [Event::RestoreLines, Event::Reinit(400_000)]
        );
    }

    #[test]
    fn test_step_while_idle_is_noop() {
        let (mut ctl, log) = controller(0, None);
        assert_eq!(ctl.step(), RecoveryState::Idle);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_lines_taken_before_first_pulse() {
        let (mut ctl, log) = controller(0, Some(3));
        ctl.recover();

        let events = log.borrow();
        assert_eq!(events[0], Event::TakeLines);
        assert_eq!(events[1], Event::Clock(false));
        assert_eq!(events[events.len() - 1], Event::Reinit(400_000));
    }
}
