//! Console UART receive task
//!
//! Producer side of the interrupt-fed ring. Every read from the buffered
//! UART becomes a [`SerialEvent`]; bytes go into the ring, faults go to
//! the main loop through [`SERIAL_FAULT`].
//!
//! The UART interrupt itself only fills `BufferedUart`'s own buffer. This
//! task runs on the thread-mode executor, so the ring's producer and
//! consumer are separate tasks rather than separate priority levels.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;
use portable_atomic::Ordering;

use sentinel_core::Producer;
use sentinel_hal_rp2040::uart::serial_fault;
use sentinel_protocol::{SerialEvent, SerialFault};

use crate::channels::{DROPPED_BYTES, SERIAL_FAULT};

/// Bytes pulled from the UART per read
const RX_CHUNK: usize = 32;

/// Console RX task - moves received bytes into the ring
#[embassy_executor::task]
pub async fn console_rx_task(mut rx: BufferedUartRx, mut producer: Producer<'static, 'static>) {
    info!("Console RX task started");

    let mut buf = [0u8; RX_CHUNK];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) => {
                trace!("RX: {} bytes", n);
                for &byte in &buf[..n] {
                    publish(SerialEvent::RxByte(byte), &mut producer);
                }
            }
            Err(e) => {
                publish(SerialEvent::Fault(serial_fault(e)), &mut producer);
            }
        }
    }
}

/// Hand one event to the consumer side
fn publish(event: SerialEvent, producer: &mut Producer<'static, 'static>) {
    match event {
        SerialEvent::RxByte(byte) => {
            if producer.push(byte).is_err() {
                DROPPED_BYTES.fetch_add(1, Ordering::Relaxed);
                SERIAL_FAULT.signal(SerialFault::QueueFull);
            }
        }
        SerialEvent::Fault(fault) => {
            SERIAL_FAULT.signal(fault);
        }
    }
}
