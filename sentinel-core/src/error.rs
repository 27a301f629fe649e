//! Error taxonomy shared by the core crates

/// Invalid initialisation parameters
///
/// Returned before any state is touched; the caller must not carry on
/// with the affected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Requested size is zero
    ZeroSize,
    /// Requested size is not a power of two
    NotPowerOfTwo,
    /// A size of one leaves no usable slot once the full/empty slot is reserved
    NoUsableCapacity,
    /// No backing storage was supplied
    MissingStorage,
    /// Backing storage is shorter than the requested size
    StorageTooSmall,
    /// Buffer is not aligned to its own size
    Misaligned,
    /// Recovery pulse count outside 1..=9
    InvalidPulseCount,
    /// A timeout or period of zero
    InvalidTimeout,
}

/// Ring buffer push/pop outcome
///
/// Both are expected and frequent; the caller decides whether to drop,
/// count or retry next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferError {
    /// No free slot for the byte
    Full,
    /// Nothing to read
    Empty,
}
