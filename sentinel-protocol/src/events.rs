//! Typed events published by the serial producer context
//!
//! The receive interrupt/task never calls into application code. It turns
//! what the UART hands it into a [`SerialEvent`] and queues it; the main
//! loop drains the queue on its own schedule.

/// Receive-side fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialFault {
    /// Framing error
    Framing,
    /// Parity error
    Parity,
    /// Hardware FIFO overrun
    Overrun,
    /// Break condition
    Break,
    /// Byte dropped because the software queue was full
    QueueFull,
}

/// Event from the serial producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialEvent {
    /// One received byte
    RxByte(u8),
    /// Receive error
    Fault(SerialFault),
}

impl SerialEvent {
    /// The byte carried by an `RxByte` event
    pub fn byte(&self) -> Option<u8> {
        match self {
            SerialEvent::RxByte(b) => Some(*b),
            SerialEvent::Fault(_) => None,
        }
    }
}
