//! SSD1306 OLED display driver
//!
//! Driver for 128x32 SSD1306 panels. The frame buffer is kept in page
//! layout (one byte covers eight vertical pixels) and pushed out in
//! horizontal addressing mode, one page per bus write.
//!
//! Every write goes through a [`SafeWrite`] implementation, so a wedged bus
//! costs one frame: the failed write recovers the bus, `show()` gives up on
//! the rest of the frame and the next refresh starts over.

use heapless::Vec;

use crate::recovery::{BusTimeout, SafeWrite};

/// Usual 7-bit address (0x3D with SA0 high)
pub const DEFAULT_ADDRESS: u8 = 0x3C;

/// Panel width in pixels
pub const WIDTH: usize = 128;
/// Panel height in pixels
pub const HEIGHT: usize = 32;
const PAGES: usize = HEIGHT / 8;
/// Frame buffer size in bytes
pub const BUFFER_SIZE: usize = WIDTH * PAGES;

/// Control byte: command stream follows
const CONTROL_COMMAND: u8 = 0x00;
/// Control byte: display data follows
const CONTROL_DATA: u8 = 0x40;

/// SSD1306 commands
#[allow(dead_code)]
mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const RESUME_RAM: u8 = 0xA4;
    pub const SET_NORMAL: u8 = 0xA6;
    pub const SET_INVERSE: u8 = 0xA7;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
    pub const SET_ADDR_MODE: u8 = 0x20;
    pub const SET_SEG_REMAP: u8 = 0xA1;
    pub const SET_COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const SET_COLUMN_ADDR: u8 = 0x21;
    pub const SET_PAGE_ADDR: u8 = 0x22;
}

/// Power-up sequence for a 128x32 panel with the internal charge pump
const INIT_SEQUENCE: &[u8] = &[
    cmd::DISPLAY_OFF,
    cmd::SET_CLOCK_DIV,
    0x80,
    cmd::SET_MUX_RATIO,
    (HEIGHT - 1) as u8,
    cmd::SET_DISPLAY_OFFSET,
    0x00,
    cmd::SET_START_LINE,
    cmd::SET_CHARGE_PUMP,
    0x14,
    cmd::SET_ADDR_MODE,
    0x00, // Horizontal
    cmd::SET_SEG_REMAP,
    cmd::SET_COM_SCAN_DEC,
    cmd::SET_COM_PINS,
    0x02, // Sequential, 32 rows
    cmd::SET_CONTRAST,
    0x8F,
    cmd::SET_PRECHARGE,
    0xF1,
    cmd::SET_VCOM_DETECT,
    0x40,
    cmd::RESUME_RAM,
    cmd::SET_NORMAL,
    cmd::DISPLAY_ON,
];

/// Longest command batch sent in one write, control byte included
const MAX_COMMAND_LEN: usize = 32;

/// SSD1306 OLED driver
pub struct Ssd1306<W> {
    bus: W,
    address: u8,
    /// Frame buffer, page-major
    buffer: [u8; BUFFER_SIZE],
}

impl<W: SafeWrite> Ssd1306<W> {
    /// Create a driver at the default address
    pub fn new(bus: W) -> Self {
        Self::with_address(bus, DEFAULT_ADDRESS)
    }

    /// Create a driver at a specific address
    pub fn with_address(bus: W, address: u8) -> Self {
        Self {
            bus,
            address,
            buffer: [0; BUFFER_SIZE],
        }
    }

    /// Send the power-up sequence
    pub fn init(&mut self) -> Result<(), BusTimeout> {
        self.commands(INIT_SEQUENCE)
    }

    /// Send a batch of commands in a single write
    fn commands(&mut self, cmds: &[u8]) -> Result<(), BusTimeout> {
        let mut frame: Vec<u8, MAX_COMMAND_LEN> = Vec::new();
        // Callers only pass the fixed sequences below, all shorter than the frame
        let _ = frame.push(CONTROL_COMMAND);
        let _ = frame.extend_from_slice(cmds);
        self.bus.safe_write(self.address, &frame)?;
        Ok(())
    }

    /// Clear the frame buffer
    pub fn clear(&mut self) {
        self.buffer.fill(0);
    }

    /// Fill every page byte with `pattern`
    pub fn fill(&mut self, pattern: u8) {
        self.buffer.fill(pattern);
    }

    /// Set or clear one pixel; coordinates off the panel are ignored
    pub fn draw_pixel(&mut self, x: usize, y: usize, on: bool) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }

        let index = (y / 8) * WIDTH + x;
        let bit = 1 << (y % 8);
        if on {
            self.buffer[index] |= bit;
        } else {
            self.buffer[index] &= !bit;
        }
    }

    /// Draw a full-height vertical line
    pub fn draw_vline(&mut self, x: usize, on: bool) {
        for y in 0..HEIGHT {
            self.draw_pixel(x, y, on);
        }
    }

    /// Read one pixel back from the frame buffer
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= WIDTH || y >= HEIGHT {
            return false;
        }
        self.buffer[(y / 8) * WIDTH + x] & (1 << (y % 8)) != 0
    }

    /// Push the frame buffer to the panel
    ///
    /// Stops at the first failed write; the bus has already been recovered
    /// by then and the next call redraws the whole frame.
    pub fn show(&mut self) -> Result<(), BusTimeout> {
        self.commands(&[
            cmd::SET_COLUMN_ADDR,
            0,
            (WIDTH - 1) as u8,
            cmd::SET_PAGE_ADDR,
            0,
            (PAGES - 1) as u8,
        ])?;

        for page in self.buffer.chunks(WIDTH) {
            let mut data = [0u8; WIDTH + 1];
            data[0] = CONTROL_DATA;
            data[1..].copy_from_slice(page);
            self.bus.safe_write(self.address, &data)?;
        }

        Ok(())
    }

    /// Invert display colours in the controller
    pub fn set_inverted(&mut self, inverted: bool) -> Result<(), BusTimeout> {
        if inverted {
            self.commands(&[cmd::SET_INVERSE])
        } else {
            self.commands(&[cmd::SET_NORMAL])
        }
    }

    /// Raw frame buffer
    pub fn buffer(&self) -> &[u8; BUFFER_SIZE] {
        &self.buffer
    }

    /// Access the underlying writer
    pub fn bus_mut(&mut self) -> &mut W {
        &mut self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_hal::I2cError;
    use std::vec::Vec;

    /// Writer that records frames and fails the write numbered `fail_at`
    struct MockWriter {
        frames: Vec<(u8, Vec<u8>)>,
        fail_at: Option<usize>,
        attempts: usize,
    }

    impl MockWriter {
        fn new() -> Self {
            Self {
                frames: Vec::new(),
                fail_at: None,
                attempts: 0,
            }
        }
    }

    impl SafeWrite for MockWriter {
        fn safe_write(&mut self, address: u8, data: &[u8]) -> Result<usize, BusTimeout> {
            let attempt = self.attempts;
            self.attempts += 1;
            if self.fail_at == Some(attempt) {
                return Err(BusTimeout {
                    cause: I2cError::Timeout,
                });
            }
            self.frames.push((address, data.to_vec()));
            Ok(data.len())
        }
    }

    #[test]
    fn test_init_sends_one_command_batch() {
        let mut display = Ssd1306::new(MockWriter::new());
        display.init().unwrap();

        let frames = &display.bus_mut().frames;
        assert_eq!(frames.len(), 1);
        let (address, data) = &frames[0];
        assert_eq!(*address, 0x3C);
        assert_eq!(data[0], CONTROL_COMMAND);
        assert_eq!(data[1], cmd::DISPLAY_OFF);
        assert_eq!(*data.last().unwrap(), cmd::DISPLAY_ON);
        assert!(data.contains(&0x1F));
    }

    #[test]
    fn test_draw_pixel_page_layout() {
        let mut display = Ssd1306::new(MockWriter::new());

        display.draw_pixel(0, 0, true);
        display.draw_pixel(5, 9, true);
        display.draw_pixel(127, 31, true);
        assert_eq!(display.buffer()[0], 0x01);
        assert_eq!(display.buffer()[WIDTH + 5], 0x02);
        assert_eq!(display.buffer()[BUFFER_SIZE - 1], 0x80);
        assert!(display.pixel(5, 9));

        display.draw_pixel(5, 9, false);
        assert!(!display.pixel(5, 9));

        // Off-panel coordinates are ignored
        display.draw_pixel(128, 0, true);
        display.draw_pixel(0, 32, true);
        assert_eq!(display.buffer().iter().filter(|b| **b != 0).count(), 2);
    }

    #[test]
    fn test_fill_and_clear() {
        let mut display = Ssd1306::new(MockWriter::new());

        display.fill(0xFF);
        assert!(display.buffer().iter().all(|b| *b == 0xFF));
        display.clear();
        assert!(display.buffer().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_vline_spans_all_pages() {
        let mut display = Ssd1306::new(MockWriter::new());
        display.draw_vline(10, true);

        for page in 0..PAGES {
            assert_eq!(display.buffer()[page * WIDTH + 10], 0xFF);
        }
        assert!(!display.pixel(11, 0));
    }

    #[test]
    fn test_show_writes_addressing_then_pages() {
        let mut display = Ssd1306::new(MockWriter::new());
        display.fill(0xAA);
        display.show().unwrap();

        let frames = &display.bus_mut().frames;
        assert_eq!(frames.len(), 1 + PAGES);
        assert_eq!(frames[0].1, [0x00u8, 0x21, 0, 127, 0x22, 0, 3]);
        for (_, data) in &frames[1..] {
            assert_eq!(data.len(), WIDTH + 1);
            assert_eq!(data[0], CONTROL_DATA);
            assert!(data[1..].iter().all(|b| *b == 0xAA));
        }
    }

    #[test]
    fn test_show_aborts_frame_on_timeout() {
        let mut writer = MockWriter::new();
        writer.fail_at = Some(2);
        let mut display = Ssd1306::new(writer);

        assert_eq!(
            display.show(),
            Err(BusTimeout {
                cause: I2cError::Timeout
            })
        );
        // Addressing + first page made it, nothing after the failure
        assert_eq!(display.bus_mut().frames.len(), 2);
        assert_eq!(display.bus_mut().attempts, 3);

        // Next refresh redraws everything
        display.show().unwrap();
        assert_eq!(display.bus_mut().frames.len(), 2 + 1 + PAGES);
    }

    #[test]
    fn test_invert_command() {
        let mut display = Ssd1306::with_address(MockWriter::new(), 0x3D);
        display.set_inverted(true).unwrap();
        display.set_inverted(false).unwrap();

        let frames = &display.bus_mut().frames;
        assert_eq!(frames[0], (0x3D, [0x00, 0xA7].to_vec()));
        assert_eq!(frames[1], (0x3D, [0x00, 0xA6].to_vec()));
    }
}
