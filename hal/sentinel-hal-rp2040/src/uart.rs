//! UART port registers and error mapping
//!
//! RP2040 has two PL011 UARTs. The DMA bridge needs the data register
//! address, the DREQ lines and the DMA enable bits; embassy keeps those
//! private, so they are reached through the PAC here.

use embassy_rp::pac;
use embassy_rp::pac::dma::vals::TreqSel;
use embassy_rp::uart;
use sentinel_protocol::SerialFault;

/// UART peripheral identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartPort {
    Uart0,
    Uart1,
}

impl UartPort {
    fn regs(self) -> pac::uart::Uart {
        match self {
            UartPort::Uart0 => pac::UART0,
            UartPort::Uart1 => pac::UART1,
        }
    }

    /// Bus address of UARTDR
    pub fn data_register(self) -> u32 {
        self.regs().uartdr().as_ptr() as u32
    }

    /// DREQ raised while the receive FIFO holds data
    pub fn rx_dreq(self) -> TreqSel {
        match self {
            UartPort::Uart0 => TreqSel::UART0_RX,
            UartPort::Uart1 => TreqSel::UART1_RX,
        }
    }

    /// DREQ raised while the transmit FIFO has room
    pub fn tx_dreq(self) -> TreqSel {
        match self {
            UartPort::Uart0 => TreqSel::UART0_TX,
            UartPort::Uart1 => TreqSel::UART1_TX,
        }
    }

    /// Let the receive FIFO drive its DREQ
    pub fn enable_rx_dma(self) {
        self.regs().uartdmacr().modify(|w| w.set_rxdmae(true));
    }

    /// Let the transmit FIFO drive its DREQ
    pub fn enable_tx_dma(self) {
        self.regs().uartdmacr().modify(|w| w.set_txdmae(true));
    }

    /// Determine which UART can use a given RX/TX pin pair
    pub fn for_pins(tx: u8, rx: u8) -> Option<Self> {
        // UART0: 0/1, 12/13, 16/17, 28/29
        // UART1: 4/5, 8/9, 20/21, 24/25
        let port = match tx {
            0 | 12 | 16 | 28 => UartPort::Uart0,
            4 | 8 | 20 | 24 => UartPort::Uart1,
            _ => return None,
        };
        (rx == tx + 1).then_some(port)
    }
}

/// Translate a receive error into the event the main loop sees
#[allow(unreachable_patterns)]
pub fn serial_fault(error: uart::Error) -> SerialFault {
    match error {
        uart::Error::Overrun => SerialFault::Overrun,
        uart::Error::Break => SerialFault::Break,
        uart::Error::Parity => SerialFault::Parity,
        uart::Error::Framing => SerialFault::Framing,
        _ => SerialFault::Framing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_for_pins() {
        assert_eq!(UartPort::for_pins(0, 1), Some(UartPort::Uart0));
        assert_eq!(UartPort::for_pins(8, 9), Some(UartPort::Uart1));
        assert_eq!(UartPort::for_pins(8, 10), None);
        assert_eq!(UartPort::for_pins(2, 3), None);
    }
}
