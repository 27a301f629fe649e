//! DMA-fed circular ingestion bridge
//!
//! A receive DMA channel writes incoming bytes into a power-of-two ring on
//! its own, wrapping at the ring boundary in hardware, with an unbounded
//! transfer count. Software owns only the read cursor. On each
//! [`read`](DmaIngestBridge::read) the channel's absolute write address is
//! sampled and turned into a ring index, and everything between the read
//! cursor and that index is copied out.
//!
//! Overrun is not detected. If the channel laps the read cursor between two
//! reads, the unread bytes are gone and the next read returns whatever the
//! ring holds between the cursors. Every index is masked into the ring, so
//! this loses data but never touches memory outside it.
//!
//! Transmit is one-shot: [`send`](DmaIngestBridge::send) waits for the
//! previous transfer, copies into a staging buffer the channel reads from,
//! and starts the next one. There is never more than one transfer in flight.

use core::sync::atomic::{fence, AtomicU8, Ordering};

use sentinel_core::config::validate_ring_size;
use sentinel_core::error::ConfigError;
use sentinel_hal::{DmaError, RxTransport, TxTransport};

/// Circular DMA receive ring plus a one-shot DMA transmitter
pub struct DmaIngestBridge<'a, R, T> {
    rx: R,
    tx: T,
    ring: &'a [AtomicU8],
    staging: &'a mut [u8],
    base: usize,
    mask: usize,
    read_index: usize,
}

impl<'a, R, T> DmaIngestBridge<'a, R, T>
where
    R: RxTransport,
    T: TxTransport,
{
    /// Bind the channels to a receive ring and a transmit staging buffer
    ///
    /// The ring length must be a power of two and the ring must start on an
    /// address aligned to its own length, as the hardware wrap requires.
    pub fn new(
        rx: R,
        tx: T,
        ring: &'a [AtomicU8],
        staging: &'a mut [u8],
    ) -> Result<Self, ConfigError> {
        validate_ring_size(ring.len())?;
        let base = ring.as_ptr() as usize;
        let mask = ring.len() - 1;
        if base & mask != 0 {
            return Err(ConfigError::Misaligned);
        }

        Ok(Self {
            rx,
            tx,
            ring,
            staging,
            base,
            mask,
            read_index: 0,
        })
    }

    /// Start the endless circular receive transfer
    ///
    /// Bytes already sitting in the ring are discarded: the read cursor is
    /// synchronised to wherever the channel starts writing.
    pub fn init(&mut self) -> Result<(), DmaError> {
        let size_log2 = self.ring.len().trailing_zeros() as u8;
        self.rx.start_ring(self.base, size_log2)?;
        self.read_index = self.hw_index();

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "dma ring at {=usize:#x}, {} bytes",
            self.base,
            self.ring.len()
        );

        Ok(())
    }

    /// Queue one outbound transfer
    ///
    /// Blocks until the previous transfer has drained, then starts a
    /// transfer of `data` and returns without waiting for it. Fails with
    /// [`DmaError::TooLong`], before waiting, if `data` does not fit the
    /// staging buffer. An empty `data` starts nothing.
    pub fn send(&mut self, data: &[u8]) -> Result<(), DmaError> {
        if data.len() > self.staging.len() {
            return Err(DmaError::TooLong);
        }
        if data.is_empty() {
            return Ok(());
        }

        self.tx.wait_idle();
        let staged = &mut self.staging[..data.len()];
        staged.copy_from_slice(data);
        self.tx.start(staged);
        Ok(())
    }

    /// Drain received bytes into `out`
    ///
    /// Copies from the read cursor up to the channel's current position, or
    /// until `out` is full, in arrival order. Returns the number of bytes
    /// copied; zero when nothing new arrived.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let hw = self.hw_index();
        // Bytes the channel wrote before the address we just sampled
        fence(Ordering::Acquire);

        let mut count = 0;
        while self.read_index != hw && count < out.len() {
            out[count] = self.ring[self.read_index].load(Ordering::Relaxed);
            self.read_index = (self.read_index + 1) & self.mask;
            count += 1;
        }
        count
    }

    /// Bytes waiting, `(hw - read) mod capacity`
    pub fn pending(&self) -> usize {
        self.hw_index().wrapping_sub(self.read_index) & self.mask
    }

    /// Software read cursor
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Ring length in bytes
    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    /// Channel write position as a ring index
    fn hw_index(&self) -> usize {
        self.rx.write_address().wrapping_sub(self.base) & self.mask
    }
}
