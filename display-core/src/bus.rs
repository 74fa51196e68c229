//! Controller transaction adapter trait and SSD1306 command set.

use core::future::Future;

/// Failure of a single bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The transfer did not finish within its time budget.
    Timeout,
    /// The controller did not acknowledge its address or a byte.
    Nack,
    /// Any other bus fault (arbitration loss, overrun, ...).
    Bus,
}

/// Timeout budget for a single transfer.
///
/// A transfer of `n` bytes (control prefix included) may take at most
/// `base_us + per_byte_us * n` microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusTiming {
    pub base_us: u32,
    pub per_byte_us: u32,
}

impl BusTiming {
    #[must_use]
    pub const fn new(base_us: u32, per_byte_us: u32) -> Self {
        Self {
            base_us,
            per_byte_us,
        }
    }

    /// Budget in microseconds for a transfer of `transfer_len` bytes.
    #[must_use]
    pub const fn budget_us(&self, transfer_len: usize) -> u32 {
        let per_byte = self.per_byte_us.saturating_mul(transfer_len as u32);
        self.base_us.saturating_add(per_byte)
    }

    /// Budget for a single command byte plus its control prefix.
    #[must_use]
    pub const fn command_budget_us(&self) -> u32 {
        self.budget_us(2)
    }
}

impl Default for BusTiming {
    fn default() -> Self {
        // 400 kHz I2C moves a byte (plus ACK) in ~22.5 us.
        Self::new(5_000, 30)
    }
}

/// Control byte prefixed to a command transfer.
pub const CONTROL_COMMAND: u8 = 0x00;
/// Control byte prefixed to a display RAM transfer.
pub const CONTROL_DATA: u8 = 0x40;

/// Largest data payload sent in one transfer (one full framebuffer).
pub const MAX_DATA_CHUNK: usize = crate::engine::FRAMEBUFFER_SIZE;

/// SSD1306 command bytes.
pub mod cmd {
    pub const SET_CONTRAST: u8 = 0x81;
    pub const DISPLAY_ALL_ON_RESUME: u8 = 0xA4;
    pub const NORMAL_DISPLAY: u8 = 0xA6;
    pub const INVERT_DISPLAY: u8 = 0xA7;
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const SET_DISPLAY_CLOCK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_MULTIPLEX: u8 = 0xA8;
    pub const SET_START_LINE: u8 = 0x40;
    pub const MEMORY_MODE: u8 = 0x20;
    pub const COLUMN_ADDR: u8 = 0x21;
    pub const PAGE_ADDR: u8 = 0x22;
    pub const SEGMENT_REMAP: u8 = 0xA1;
    pub const COM_SCAN_DEC: u8 = 0xC8;
    pub const CHARGE_PUMP: u8 = 0x8D;
}

/// Power-up register sequence for a 128x64 panel with internal charge pump.
///
/// Orientation is handled in software, so this is the same for both orientations.
pub const INIT_SEQUENCE: &[u8] = &[
    cmd::DISPLAY_OFF,
    cmd::SET_DISPLAY_CLOCK_DIV,
    0x80,
    cmd::SET_MULTIPLEX,
    0x3F,
    cmd::SET_DISPLAY_OFFSET,
    0x00,
    cmd::SET_START_LINE,
    cmd::CHARGE_PUMP,
    0x14,
    cmd::MEMORY_MODE,
    0x00,
    cmd::SEGMENT_REMAP,
    cmd::COM_SCAN_DEC,
    cmd::SET_COM_PINS,
    0x12,
    cmd::SET_CONTRAST,
    0xCF,
    cmd::SET_PRECHARGE,
    0xF1,
    cmd::SET_VCOM_DETECT,
    0x40,
    cmd::DISPLAY_ALL_ON_RESUME,
    cmd::NORMAL_DISPLAY,
    cmd::DISPLAY_ON,
];

/// Byte-transaction writer to the display controller.
///
/// Each call is one bounded transaction: it either completes within its
/// time budget or fails. Implementations never retry.
pub trait DisplayBus {
    /// Send one command byte.
    fn write_command(&mut self, byte: u8) -> impl Future<Output = Result<(), BusError>>;

    /// Send display RAM bytes at the current address window.
    fn write_data(&mut self, data: &[u8]) -> impl Future<Output = Result<(), BusError>>;
}

impl<T: DisplayBus> DisplayBus for &mut T {
    fn write_command(&mut self, byte: u8) -> impl Future<Output = Result<(), BusError>> {
        (**self).write_command(byte)
    }

    fn write_data(&mut self, data: &[u8]) -> impl Future<Output = Result<(), BusError>> {
        (**self).write_data(data)
    }
}
