//! Configuration types
//!
//! Board-level settings for the bus, the serial links, buffer sizing and the
//! supply monitor. The firmware build script generates a `SentinelConfig`
//! constant from `board.toml`; [`SentinelConfig::DEFAULT`] holds the
//! reference values.

use crate::error::ConfigError;

/// Upper bound on recovery clock pulses (one byte plus the ACK slot)
pub const MAX_RECOVERY_PULSES: u8 = 9;

/// Check that a circular buffer size is usable with mask arithmetic
pub const fn validate_ring_size(size: usize) -> Result<(), ConfigError> {
    if size == 0 {
        return Err(ConfigError::ZeroSize);
    }
    if !size.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo);
    }
    if size == 1 {
        return Err(ConfigError::NoUsableCapacity);
    }
    Ok(())
}

/// Display bus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// 7-bit address of the display controller
    pub address: u8,
    /// SCL frequency in Hz
    pub frequency_hz: u32,
    /// Bound on a single write
    pub write_timeout_us: u32,
    /// Half-period of a recovery clock pulse and hold time of each stop step
    pub pulse_width_us: u32,
    /// Recovery clock pulses before giving up on the peer (at most 9)
    pub max_pulses: u8,
    /// SDA pad
    pub sda_pin: u8,
    /// SCL pad
    pub scl_pin: u8,
}

impl BusConfig {
    /// Reference values: 0x3C at 400 kHz, 50 ms bound, 10 µs pulses
    pub const DEFAULT: Self = Self {
        address: 0x3C,
        frequency_hz: 400_000,
        write_timeout_us: 50_000,
        pulse_width_us: 10,
        max_pulses: MAX_RECOVERY_PULSES,
        sda_pin: 4,
        scl_pin: 5,
    };

    /// Pulse count actually used by recovery, clamped to 1..=9
    pub fn recovery_pulses(&self) -> u8 {
        self.max_pulses.clamp(1, MAX_RECOVERY_PULSES)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Buffer sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferConfig {
    /// Interrupt-fed ring (power of two)
    pub rx_ring_size: usize,
    /// DMA destination ring (power of two, aligned to its size)
    pub dma_ring_size: usize,
    /// Command line accumulator, including the terminator slot
    pub line_capacity: usize,
}

impl BufferConfig {
    pub const DEFAULT: Self = Self {
        rx_ring_size: 256,
        dma_ring_size: 256,
        line_capacity: 16,
    };
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One UART link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// TX pad
    pub tx_pin: u8,
    /// RX pad
    pub rx_pin: u8,
}

impl SerialConfig {
    /// Interrupt-driven console link (UART0)
    pub const CONSOLE: Self = Self {
        baudrate: 115_200,
        tx_pin: 0,
        rx_pin: 1,
    };

    /// DMA-driven link (UART1)
    pub const LINK: Self = Self {
        baudrate: 115_200,
        tx_pin: 8,
        rx_pin: 9,
    };
}

/// Supply monitor and main loop pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorConfig {
    /// Supply below this is reported as low battery
    pub low_voltage_mv: u16,
    /// ADC sampling period
    pub sample_period_ms: u32,
    /// Liveness log period
    pub heartbeat_ms: u32,
    /// Display redraw period
    pub refresh_ms: u32,
}

impl MonitorConfig {
    pub const DEFAULT: Self = Self {
        low_voltage_mv: 3000,
        sample_period_ms: 500,
        heartbeat_ms: 1000,
        refresh_ms: 20,
    };
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete board configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SentinelConfig {
    pub bus: BusConfig,
    pub buffers: BufferConfig,
    pub console: SerialConfig,
    pub link: SerialConfig,
    pub monitor: MonitorConfig,
}

impl SentinelConfig {
    pub const DEFAULT: Self = Self {
        bus: BusConfig::DEFAULT,
        buffers: BufferConfig::DEFAULT,
        console: SerialConfig::CONSOLE,
        link: SerialConfig::LINK,
        monitor: MonitorConfig::DEFAULT,
    };

    /// Check every constraint the components rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ring_size(self.buffers.rx_ring_size)?;
        validate_ring_size(self.buffers.dma_ring_size)?;
        if self.buffers.line_capacity < 2 {
            return Err(ConfigError::NoUsableCapacity);
        }

        if self.bus.max_pulses == 0 || self.bus.max_pulses > MAX_RECOVERY_PULSES {
            return Err(ConfigError::InvalidPulseCount);
        }
        if self.bus.write_timeout_us == 0 || self.bus.pulse_width_us == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let m = &self.monitor;
        if m.sample_period_ms == 0 || m.heartbeat_ms == 0 || m.refresh_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
