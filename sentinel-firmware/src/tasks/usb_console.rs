//! USB CDC-ACM console
//!
//! The device stack and the OUT endpoint run together in one task. Packets
//! are copied into [`USB_RX`]; the main loop polls the pipe the same way it
//! polls the other sources, so a slow main loop only back-pressures the
//! host.

use defmt::*;
use embassy_futures::join::join;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config};
use static_cell::{ConstStaticCell, StaticCell};

use crate::channels::USB_RX;

/// Full-speed bulk packet size
const MAX_PACKET_SIZE: u16 = 64;

static CONFIG_DESCRIPTOR: ConstStaticCell<[u8; 256]> = ConstStaticCell::new([0; 256]);
static BOS_DESCRIPTOR: ConstStaticCell<[u8; 256]> = ConstStaticCell::new([0; 256]);
static CONTROL_BUF: ConstStaticCell<[u8; 64]> = ConstStaticCell::new([0; 64]);
static CDC_STATE: StaticCell<State<'static>> = StaticCell::new();

fn usb_config() -> Config<'static> {
    let mut config = Config::new(0xc0de, 0x5e71);
    config.manufacturer = Some("Sentinel");
    config.product = Some("Sentinel console");
    config.serial_number = Some("00000001");
    config.max_power = 100;
    config.max_packet_size_0 = 64;

    // Windows needs the IAD triple for CDC
    config.device_class = 0xEF;
    config.device_sub_class = 0x02;
    config.device_protocol = 0x01;
    config.composite_with_iads = true;

    config
}

/// USB console task - enumerates and feeds [`USB_RX`]
#[embassy_executor::task]
pub async fn usb_console_task(driver: Driver<'static, USB>) {
    let mut builder = Builder::new(
        driver,
        usb_config(),
        CONFIG_DESCRIPTOR.take(),
        BOS_DESCRIPTOR.take(),
        &mut [],
        CONTROL_BUF.take(),
    );
    let mut class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), MAX_PACKET_SIZE);
    let mut device = builder.build();

    let rx_fut = async {
        let mut packet = [0u8; MAX_PACKET_SIZE as usize];
        loop {
            class.wait_connection().await;
            info!("USB console connected");

            loop {
                match class.read_packet(&mut packet).await {
                    Ok(n) => USB_RX.write_all(&packet[..n]).await,
                    Err(EndpointError::BufferOverflow) => warn!("USB packet too large"),
                    Err(EndpointError::Disabled) => break,
                }
            }

            info!("USB console disconnected");
        }
    };

    join(device.run(), rx_fut).await;
}
