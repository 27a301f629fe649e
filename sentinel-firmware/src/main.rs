//! Sentinel - Threshold Monitor Firmware
//!
//! Main firmware binary for RP2040 boards (Raspberry Pi Pico wiring).
//!
//! Three byte sources feed line commands into a cooperative main loop, each
//! through its own decoder:
//!
//! - USB CDC console: polled without waiting; every key is echoed to the log.
//! - UART0 (console): interrupt-driven; a producer task pushes bytes into a
//!   lock-free ring that the main loop drains.
//! - UART1 (link): a DMA channel writes into a circular buffer on its own;
//!   the main loop samples the channel cursor and drains up to it.
//!
//! The main loop also refreshes an SSD1306 over I2C0 through the bus
//! recovery controller, samples VSYS, and logs a heartbeat.

#![no_std]
#![no_main]

use core::sync::atomic::AtomicU8;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{
    Adc, Channel as AdcChannel, Config as AdcConfig, InterruptHandler as AdcInterruptHandler,
};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_rp::i2c::{self, I2c, InterruptHandler as I2cInterruptHandler};
use embassy_rp::peripherals::{I2C0, UART0, USB};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_rp::usb::{Driver as UsbDriver, InterruptHandler as UsbInterruptHandler};
use embassy_time::{Delay, Duration, Instant, Timer};
use portable_atomic::Ordering;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use sentinel_core::RingBuffer;
use sentinel_drivers::{BusRecoveryController, DmaIngestBridge, Ssd1306};
use sentinel_hal::OutputPin;
use sentinel_hal_rp2040::{I2cLines, Led, OneShotTx, RecoverableI2c, RingRx, UartPort};
use sentinel_protocol::CommandDecoder;

use crate::app::App;
use crate::channels::{DROPPED_BYTES, SERIAL_FAULT, USB_PIPE_SIZE, USB_RX};
use crate::config::{BOARD, DMA_RING_SIZE, LINE_CAPACITY, RX_RING_SIZE};

mod app;
mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
    ADC_IRQ_FIFO => AdcInterruptHandler;
    USBCTRL_IRQ => UsbInterruptHandler<USB>;
});

/// Bytes drained from the DMA ring per read
const DMA_CHUNK: usize = 32;

/// Longest reply sent on the link
const TX_STAGING_SIZE: usize = 32;

// Static cells for UART buffers (must live forever)
static UART_TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static UART_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Console ring storage, shared by the producer task and the main loop
static RX_STORAGE: [AtomicU8; RX_RING_SIZE] = [const { AtomicU8::new(0) }; RX_RING_SIZE];
static RX_RING: StaticCell<RingBuffer<'static>> = StaticCell::new();

/// DMA destination; the hardware wrap needs it aligned to its size
#[repr(C, align(256))]
struct DmaRing([AtomicU8; DMA_RING_SIZE]);

static DMA_RING: DmaRing = DmaRing([const { AtomicU8::new(0) }; DMA_RING_SIZE]);
static TX_STAGING: StaticCell<[u8; TX_STAGING_SIZE]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Sentinel firmware starting...");

    unwrap!(BOARD.validate());

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // USB CDC console
    let usb_driver = UsbDriver::new(p.USB, Irqs);

    // Console UART0 (GPIO0 TX, GPIO1 RX)
    let mut console_config = UartConfig::default();
    console_config.baudrate = BOARD.console.baudrate;

    let tx_buf = UART_TX_BUF.init([0u8; 64]);
    let rx_buf = UART_RX_BUF.init([0u8; 256]);

    let console = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, console_config);
    let console = console.into_buffered(Irqs, tx_buf, rx_buf);
    let (_console_tx, console_rx) = console.split();

    let ring = RX_RING.init(unwrap!(RingBuffer::new(&RX_STORAGE, RX_RING_SIZE)));
    let (producer, mut consumer) = ring.split();

    info!("Console UART initialized, {} byte ring", RX_RING_SIZE);

    // Link UART1 (GPIO8 TX, GPIO9 RX), serviced by DMA_CH0/DMA_CH1
    let mut link_config = UartConfig::default();
    link_config.baudrate = BOARD.link.baudrate;
    let _link = Uart::new_blocking(p.UART1, p.PIN_8, p.PIN_9, link_config);

    let link_port = unwrap!(UartPort::for_pins(BOARD.link.tx_pin, BOARD.link.rx_pin));

    let staging = TX_STAGING.init([0u8; TX_STAGING_SIZE]);
    let mut bridge = unwrap!(DmaIngestBridge::new(
        RingRx::new(p.DMA_CH0, link_port),
        OneShotTx::new(p.DMA_CH1, link_port),
        &DMA_RING.0,
        staging,
    ));
    unwrap!(bridge.init());

    info!("Link DMA ring running, {} bytes", DMA_RING_SIZE);

    // Display on I2C0 (GPIO4 SDA, GPIO5 SCL)
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = BOARD.bus.frequency_hz;
    let i2c = I2c::new_async(p.I2C0, p.PIN_5, p.PIN_4, Irqs, i2c_config);

    let controller = BusRecoveryController::new(
        RecoverableI2c::new(i2c),
        I2cLines::new(BOARD.bus.sda_pin, BOARD.bus.scl_pin),
        Delay,
        BOARD.bus,
    );
    let display = Ssd1306::with_address(controller, BOARD.bus.address);
    let mut app = App::new(display, BOARD.monitor.low_voltage_mv);
    app.start();

    // VSYS/3 on GPIO29
    let mut adc = Adc::new(p.ADC, Irqs, AdcConfig::default());
    let mut vsys = AdcChannel::new_pin(p.PIN_29, Pull::None);

    let mut led = Led::new(Output::new(p.PIN_25, Level::Low));

    spawner
        .spawn(tasks::usb_console_task(usb_driver))
        .unwrap();
    spawner
        .spawn(tasks::console_rx_task(console_rx, producer))
        .unwrap();

    info!("All tasks spawned, entering main loop");

    let mut usb_decoder: CommandDecoder<LINE_CAPACITY> = CommandDecoder::new();
    let mut console_decoder: CommandDecoder<LINE_CAPACITY> = CommandDecoder::new();
    let mut link_decoder: CommandDecoder<LINE_CAPACITY> = CommandDecoder::new();
    let mut chunk = [0u8; DMA_CHUNK];
    let mut keys = [0u8; USB_PIPE_SIZE];

    let refresh_period = Duration::from_millis(BOARD.monitor.refresh_ms as u64);
    let sample_period = Duration::from_millis(BOARD.monitor.sample_period_ms as u64);
    let heartbeat_period = Duration::from_millis(BOARD.monitor.heartbeat_ms as u64);

    let start = Instant::now();
    let mut next_refresh = start;
    let mut next_sample = start;
    let mut next_heartbeat = start + heartbeat_period;

    loop {
        let now = Instant::now();
        let uptime_ms = now.duration_since(start).as_millis();

        // USB console: take whatever has arrived, never wait
        while let Ok(n) = USB_RX.try_read(&mut keys) {
            for &byte in &keys[..n] {
                trace!("[Key: {} ({=u8:#04x})]", byte as char, byte);
                if let Some(cmd) = usb_decoder.feed(byte) {
                    app.handle(cmd, uptime_ms);
                }
            }
        }

        // Console: drain the interrupt-fed ring
        while let Ok(byte) = consumer.pop() {
            if let Some(cmd) = console_decoder.feed(byte) {
                app.handle(cmd, uptime_ms);
            }
        }

        // Link: drain the DMA ring up to the channel cursor
        loop {
            let n = bridge.read(&mut chunk);
            if n == 0 {
                break;
            }
            for &byte in &chunk[..n] {
                let Some(cmd) = link_decoder.feed(byte) else {
                    continue;
                };
                if let Some(reply) = app.handle(cmd, uptime_ms) {
                    if let Err(e) = bridge.send(reply) {
                        warn!("Link reply dropped: {}", e);
                    }
                }
            }
        }

        if let Some(fault) = SERIAL_FAULT.try_take() {
            warn!(
                "Console fault: {} ({} bytes dropped so far)",
                fault,
                DROPPED_BYTES.load(Ordering::Relaxed)
            );
        }

        if now >= next_sample {
            match adc.read(&mut vsys).await {
                Ok(raw) => app.sample_supply(raw),
                Err(e) => warn!("ADC read failed: {}", e),
            }
            next_sample = now + sample_period;
        }

        if now >= next_refresh {
            app.refresh();
            next_refresh = now + refresh_period;
        }

        if now >= next_heartbeat {
            led.toggle();
            trace!(
                "Heartbeat: up {} ms, inverted={}, console pending {}, link pending {}",
                uptime_ms,
                app.inverted(),
                consumer.len(),
                bridge.pending()
            );
            next_heartbeat = now + heartbeat_period;
        }

        Timer::after_millis(1).await;
    }
}
