//! Application state and command dispatch
//!
//! Owns the display and the supply monitor. Commands from either serial
//! source land in [`App::handle`]; the main loop calls the periodic hooks.

use defmt::*;

use sentinel_core::monitor::{vsys_millivolts, SupplyStatus, VoltageMonitor};
use sentinel_drivers::ssd1306::{Ssd1306, HEIGHT, WIDTH};
use sentinel_drivers::SafeWrite;
use sentinel_protocol::Command;

/// Reply sent on the DMA link for a PING
pub const PONG: &[u8] = b"PONG\n";

/// Width of the scanning bar in pixels
const BAR_WIDTH: usize = 2;

/// Side of the low-battery marker in the top right corner
const MARKER_SIZE: usize = 6;

pub struct App<W> {
    display: Ssd1306<W>,
    monitor: VoltageMonitor,
    inverted: bool,
    scan_x: usize,
    /// Consecutive frames lost to bus timeouts
    lost_frames: u32,
}

impl<W: SafeWrite> App<W> {
    pub fn new(display: Ssd1306<W>, low_voltage_mv: u16) -> Self {
        Self {
            display,
            monitor: VoltageMonitor::new(low_voltage_mv),
            inverted: false,
            scan_x: 0,
            lost_frames: 0,
        }
    }

    /// Bring up the panel
    ///
    /// A failed init is only logged; the bus has been recovered and the
    /// refresh loop keeps trying to push frames.
    pub fn start(&mut self) {
        match self.display.init() {
            Ok(()) => info!("Display initialized"),
            Err(e) => warn!("Display init failed: {}", e.cause),
        }
    }

    /// Act on a decoded command, returning the reply for the link if any
    pub fn handle(&mut self, cmd: Command, uptime_ms: u64) -> Option<&'static [u8]> {
        debug!("Command: {}", cmd);
        match cmd {
            Command::Invert => {
                self.inverted = true;
                None
            }
            Command::Normal => {
                self.inverted = false;
                None
            }
            Command::Ping => {
                info!("PING, up {} ms", uptime_ms);
                Some(PONG)
            }
        }
    }

    /// Draw and push one frame, then advance the bar
    pub fn refresh(&mut self) {
        let background = if self.inverted { 0xFF } else { 0x00 };
        self.display.fill(background);

        for dx in 0..BAR_WIDTH {
            self.display.draw_vline((self.scan_x + dx) % WIDTH, !self.inverted);
        }

        if self.monitor.status() == Some(SupplyStatus::LowBattery) {
            for y in 0..MARKER_SIZE.min(HEIGHT) {
                for x in WIDTH - MARKER_SIZE..WIDTH {
                    self.display.draw_pixel(x, y, !self.inverted);
                }
            }
        }

        match self.display.show() {
            Ok(()) => {
                if self.lost_frames > 0 {
                    info!("Display back after {} lost frames", self.lost_frames);
                    self.lost_frames = 0;
                }
            }
            Err(_) => {
                self.lost_frames += 1;
            }
        }

        self.scan_x = (self.scan_x + 1) % WIDTH;
    }

    /// Feed a raw VSYS reading to the supply monitor
    pub fn sample_supply(&mut self, raw: u16) {
        let millivolts = vsys_millivolts(raw);
        match self.monitor.update(millivolts) {
            Some(SupplyStatus::Ok) => info!("Supply OK: {} mV", millivolts),
            Some(SupplyStatus::LowBattery) => warn!("Low battery: {} mV", millivolts),
            None => trace!("VSYS {} mV", millivolts),
        }
    }

    pub fn inverted(&self) -> bool {
        self.inverted
    }
}
