//! Board configuration
//!
//! `BOARD` is generated by build.rs from board.toml, which is validated
//! there; the derived constants below size the static buffers.

use sentinel_core::config::{BufferConfig, BusConfig, MonitorConfig, SentinelConfig, SerialConfig};

include!(concat!(env!("OUT_DIR"), "/board_config.rs"));

/// Interrupt-fed ring size
pub const RX_RING_SIZE: usize = BOARD.buffers.rx_ring_size;

/// DMA receive ring size
pub const DMA_RING_SIZE: usize = BOARD.buffers.dma_ring_size;

/// Command line accumulator size
pub const LINE_CAPACITY: usize = BOARD.buffers.line_capacity;
