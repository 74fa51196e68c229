//! USB HID display for RP2040.
//!
//! Presents a composite USB device: a mouse driven by a rotary encoder and
//! a CDC serial port carrying display commands for a 128x64 SSD1306 panel.
//! The protocol, framing and rendering live in `display-core`; this crate
//! supplies the RP2040 side of its traits.
//!
//! | Function      | Pin    |
//! |---------------|--------|
//! | I2C0 SDA      | GPIO4  |
//! | I2C0 SCL      | GPIO5  |
//! | Encoder CLK   | GPIO10 |
//! | Encoder DT    | GPIO11 |
//! | Encoder SW    | GPIO12 |
//!
//! Encoder pins are pulled up and active low.

#![no_std]

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("features `dev-panic` and `prod-panic` are mutually exclusive");

pub use hid_display_core::{
    BridgeError, BusError, BusTiming, DisplayBridge, DisplayEngine, EncoderPointer, Orientation,
    PointerError, TickReport,
};
pub use hid_display_proto::{CommandFramer, FramerConfig};

pub mod cdc;
pub mod encoder;
pub mod ssd1306;
pub mod usb;

pub use cdc::{CdcTransport, CommandPipe};
pub use encoder::{watch_button, EncoderPins};
pub use ssd1306::Ssd1306Bus;
pub use usb::UsbMouse;

/// I2C clock for the panel.
pub const I2C_FREQUENCY: u32 = 400_000;

/// Panel orientation, fixed at build time.
#[cfg(not(feature = "portrait"))]
pub const ORIENTATION: Orientation = Orientation::Normal;
#[cfg(feature = "portrait")]
pub const ORIENTATION: Orientation = Orientation::Rotated180;

/// Shown until the host draws something.
pub const BOOT_BANNER: &[u8] = b"Booting.......";

/// Scheduling loop yield between ticks, in microseconds.
pub const LOOP_YIELD_US: u64 = 100;

/// Framer settings for this build.
pub fn framer_config() -> FramerConfig {
    FramerConfig {
        accept_diagnostics: cfg!(feature = "test-commands"),
        line_terminator: cfg!(feature = "legacy-line-terminator"),
        ..FramerConfig::default()
    }
}
