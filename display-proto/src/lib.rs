//! Binary protocol for the USB HID display.
//!
//! The host drives the display over a serial channel using compact binary
//! frames. Every frame starts with an opcode byte followed by a positional
//! payload:
//!
//! ```text
//! 0x01 CLEAR          : [01]
//! 0x02 DRAW_TEXT      : [02][x][y][len][text*len]      (len <= 124, clamped)
//! 0x03 SET_CURSOR     : [03][x][y]
//! 0x04 INVERT         : [04][0|1]
//! 0x05 BRIGHTNESS     : [05][level 0-255]
//! 0x06 PROGRESS_BAR   : [06][x][y][w][h][pct 0-100]
//! 0x07 POWER          : [07][0|1]
//! 0xF0 TEST           : [F0][subcmd]   (diagnostic builds only)
//! ```
//!
//! Frames are at most [`MAX_FRAME_SIZE`] bytes. There are no checksums or
//! replies, except the TEST ping which echoes `[F0, 00]`.
//!
//! # Modules
//!
//! - [`opcode`]: opcode table and framing rules
//! - [`framer`]: byte-at-a-time frame reassembly ([`CommandFramer`])
//! - [`command`]: decoding frames into [`Command`]s
//! - [`encode`]: encoding commands to wire bytes ([`CommandBuilder`])
//!
//! # Example
//!
//! ```
//! use hid_display_proto::{Command, CommandFramer, FramerConfig};
//!
//! let mut framer = CommandFramer::new(FramerConfig::default());
//! let mut frames = 0;
//! for &b in &[0x02, 0, 0, 2, b'O', b'K', 0x04, 1] {
//!     if let Ok(Some(frame)) = framer.push(b) {
//!         frames += 1;
//!         let cmd = Command::from_frame(&frame).unwrap();
//!         assert!(matches!(cmd, Command::DrawText { .. } | Command::Invert(true)));
//!     }
//! }
//! assert_eq!(frames, 2);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`embedded-io`**: Encode commands into `embedded_io::Write` sinks

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod command;
pub mod encode;
pub mod framer;
pub mod opcode;

pub use command::{Command, DecodeError, TestCommand, PING_REPLY};
pub use encode::{CommandBuilder, EncodeError};
pub use framer::{
    CommandFramer, Frame, FramerConfig, FramerState, FramingError, DEFAULT_PARTIAL_TIMEOUT_US,
};
pub use opcode::{Framing, Opcode, MAX_FRAME_SIZE, MAX_TEXT_LEN, TEXT_HEADER_LEN};
