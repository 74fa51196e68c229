//! Platform-agnostic core of the USB HID display.
//!
//! This crate holds everything between the serial byte stream and the
//! physical bus writes, without any hardware dependencies. It can be used
//! both in embedded `no_std` environments and on host for testing.
//!
//! # Overview
//!
//! - [`bus`]: controller transaction trait ([`DisplayBus`]) and SSD1306 command set
//! - [`font`]: 8x8 ASCII glyphs
//! - [`engine`]: framebuffer, cursor and drawing primitives ([`DisplayEngine`])
//! - [`dispatch`]: frame to engine call mapping ([`dispatch()`])
//! - [`transport`]: command byte source trait ([`Transport`])
//! - [`pointer`]: encoder decoding and pointer report traits ([`PointerSource`], [`PointerSink`])
//! - [`bridge`]: one scheduling step tying it all together ([`DisplayBridge`])
//!
//! # Data flow
//!
//! ```text
//! Transport ──bytes──▶ CommandFramer ──Frame──▶ dispatch ──▶ DisplayEngine ──▶ DisplayBus
//! PointerSource ──PointerReport──▶ PointerSink
//! ```
//!
//! # Panel geometry
//!
//! | Property | Value |
//! |----------|-------|
//! | Resolution | 128 x 64, 1 bpp |
//! | Framebuffer | 8 pages x 128 columns = 1024 bytes |
//! | Glyph cell | 8 x 8 |
//! | Orientations | Normal, Rotated180 (software) |
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod bridge;
pub mod bus;
pub mod dispatch;
pub mod engine;
pub mod font;
pub mod pointer;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use bridge::{BridgeError, DisplayBridge, TickReport};
pub use bus::{BusError, BusTiming, DisplayBus};
pub use dispatch::{dispatch, Dispatched};
pub use engine::{DisplayEngine, Orientation, FRAMEBUFFER_SIZE, HEIGHT, WIDTH};
pub use pointer::{
    EncoderPointer, PointerError, PointerPins, PointerReport, PointerSample, PointerSink,
    PointerSource, PointerTracker, Rotation,
};
pub use transport::{Transport, TransportError};

pub use hid_display_proto as proto;
