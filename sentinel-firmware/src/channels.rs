//! Producer-to-main-loop signalling
//!
//! UART console bytes travel through the lock-free ring; only faults and
//! drop counts come this way. USB console bytes are staged in a pipe that
//! the main loop polls without waiting.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_sync::signal::Signal;
use portable_atomic::AtomicU32;

use sentinel_protocol::SerialFault;

/// Most recent receive fault on the console UART
pub static SERIAL_FAULT: Signal<CriticalSectionRawMutex, SerialFault> = Signal::new();

/// Console bytes dropped because the ring was full
pub static DROPPED_BYTES: AtomicU32 = AtomicU32::new(0);

/// Bytes staged between a USB OUT packet and the main loop
pub const USB_PIPE_SIZE: usize = 64;

/// USB console bytes awaiting the main loop
pub static USB_RX: Pipe<CriticalSectionRawMutex, USB_PIPE_SIZE> = Pipe::new();
