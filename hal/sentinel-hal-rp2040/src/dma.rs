//! Raw DMA channels for the UART ingestion bridge
//!
//! embassy's DMA transfers are one-shot futures over a borrowed buffer.
//! The receive side here needs the opposite: a channel left running
//! forever in ring mode, whose write address software samples on its own
//! schedule. Both channels are therefore programmed through the PAC.
//!
//! The RP2040 has no endless transfer count, so the ring channel is armed
//! with `u32::MAX` transfers and re-triggered whenever a cursor sample
//! finds it drained (about four days of continuous traffic at 115200 baud).

use core::sync::atomic::{compiler_fence, Ordering};

use embassy_rp::dma::Channel;
use embassy_rp::pac;
use embassy_rp::pac::dma::vals::DataSize;
use embassy_rp::Peri;
use sentinel_hal::{DmaError, RxCursor, RxTransport, TxTransport};

use crate::uart::UartPort;

/// Largest ring the address wrap supports (32 KiB)
const MAX_RING_LOG2: u8 = 15;

/// UART receive channel writing into a circular buffer
pub struct RingRx<'d, C: Channel> {
    ch: Peri<'d, C>,
    port: UartPort,
    armed: bool,
}

impl<'d, C: Channel> RingRx<'d, C> {
    pub fn new(ch: Peri<'d, C>, port: UartPort) -> Self {
        Self {
            ch,
            port,
            armed: false,
        }
    }

    fn regs(&self) -> pac::dma::Channel {
        pac::DMA.ch(self.ch.number() as usize)
    }

    /// Re-trigger a ring channel that has used up its transfer count
    fn keep_alive(&self) {
        let regs = self.regs();
        if self.armed && !regs.ctrl_trig().read().busy() {
            regs.trans_count().write_value(u32::MAX);
            regs.ctrl_trig().modify(|w| w.set_en(true));
        }
    }
}

impl<C: Channel> RxCursor for RingRx<'_, C> {
    fn write_address(&self) -> usize {
        self.keep_alive();
        self.regs().write_addr().read() as usize
    }
}

impl<C: Channel> RxTransport for RingRx<'_, C> {
    fn start_ring(&mut self, base: usize, size_log2: u8) -> Result<(), DmaError> {
        if size_log2 == 0 || size_log2 > MAX_RING_LOG2 {
            return Err(DmaError::Misaligned);
        }
        if base & ((1 << size_log2) - 1) != 0 {
            return Err(DmaError::Misaligned);
        }

        let number = self.ch.number();
        let regs = self.regs();
        self.port.enable_rx_dma();

        regs.read_addr().write_value(self.port.data_register());
        regs.write_addr().write_value(base as u32);
        regs.trans_count().write_value(u32::MAX);

        compiler_fence(Ordering::SeqCst);
        regs.ctrl_trig().write(|w| {
            w.set_treq_sel(self.port.rx_dreq());
            w.set_data_size(DataSize::SIZE_BYTE);
            w.set_incr_read(false);
            w.set_incr_write(true);
            // Wrap the write address
            w.set_ring_sel(true);
            w.set_ring_size(size_log2);
            w.set_chain_to(number);
            w.set_irq_quiet(true);
            w.set_en(true);
        });
        compiler_fence(Ordering::SeqCst);

        self.armed = true;
        Ok(())
    }
}

/// UART transmit channel running one transfer at a time
pub struct OneShotTx<'d, C: Channel> {
    ch: Peri<'d, C>,
    port: UartPort,
}

impl<'d, C: Channel> OneShotTx<'d, C> {
    pub fn new(ch: Peri<'d, C>, port: UartPort) -> Self {
        port.enable_tx_dma();
        Self { ch, port }
    }

    fn regs(&self) -> pac::dma::Channel {
        pac::DMA.ch(self.ch.number() as usize)
    }
}

impl<C: Channel> TxTransport for OneShotTx<'_, C> {
    fn wait_idle(&mut self) {
        let regs = self.regs();
        while regs.ctrl_trig().read().busy() {
            core::hint::spin_loop();
        }
        compiler_fence(Ordering::SeqCst);
    }

    fn start(&mut self, data: &[u8]) {
        let number = self.ch.number();
        let regs = self.regs();

        regs.read_addr().write_value(data.as_ptr() as u32);
        regs.write_addr().write_value(self.port.data_register());
        regs.trans_count().write_value(data.len() as u32);

        compiler_fence(Ordering::SeqCst);
        regs.ctrl_trig().write(|w| {
            w.set_treq_sel(self.port.tx_dreq());
            w.set_data_size(DataSize::SIZE_BYTE);
            w.set_incr_read(true);
            w.set_incr_write(false);
            w.set_chain_to(number);
            w.set_irq_quiet(true);
            w.set_en(true);
        });
        compiler_fence(Ordering::SeqCst);
    }
}
