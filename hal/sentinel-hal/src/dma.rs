//! DMA transport abstractions
//!
//! A receive channel writes into a circular destination buffer on its own;
//! software only gets to look at where the hardware write pointer currently
//! is. A transmit channel runs one-shot transfers out of a staging buffer.

/// Errors from DMA transport setup or transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Transfer longer than the staging buffer
    TooLong,
    /// Ring buffer not aligned to its own size
    Misaligned,
}

/// Raw access to a receive channel's hardware write pointer
pub trait RxCursor {
    /// Absolute address the channel will write next
    fn write_address(&self) -> usize;
}

/// Receive channel able to run an endless circular transfer
pub trait RxTransport: RxCursor {
    /// Start writing incoming bytes into the ring at `base`
    ///
    /// `size_log2` is the ring size as a power of two; the hardware wraps
    /// the write address inside it without software help. The transfer
    /// count is unbounded.
    fn start_ring(&mut self, base: usize, size_log2: u8) -> Result<(), DmaError>;
}

/// Transmit channel running one transfer at a time
pub trait TxTransport {
    /// Block until the previous transfer, if any, has drained
    fn wait_idle(&mut self);

    /// Start a one-shot transfer of `data` and return immediately
    ///
    /// Callers must not touch `data` until [`TxTransport::wait_idle`]
    /// has returned.
    fn start(&mut self, data: &[u8]);
}
