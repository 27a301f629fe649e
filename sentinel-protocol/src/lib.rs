//! Sentinel Line Command Protocol
//!
//! Commands arrive as ASCII lines on either serial source, terminated by
//! `\n` or `\r`. Tokens are exact and case-sensitive:
//!
//! ```text
//! ┌────────┬─────────────────────────┐
//! │ "INV"  │ invert the display      │
//! │ "NORM" │ normal display          │
//! │ "PING" │ liveness check          │
//! └────────┴─────────────────────────┘
//! ```
//!
//! Anything else, including an empty line, yields no command.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod events;

pub use command::{Command, CommandDecoder, DEFAULT_LINE_CAPACITY};
pub use events::{SerialEvent, SerialFault};
