//! SSD1306 transaction adapter over async I2C.

use embassy_time::{with_timeout, Duration};
use embedded_hal::i2c::{Error as _, ErrorKind};
use embedded_hal_async::i2c::I2c;
use hid_display_core::bus::{CONTROL_COMMAND, CONTROL_DATA, MAX_DATA_CHUNK};
use hid_display_core::{BusError, BusTiming, DisplayBus};

/// 7-bit address of the panel (SA0 tied low).
pub const DEFAULT_ADDRESS: u8 = 0x3C;

/// [`DisplayBus`] implementation writing control-prefixed I2C transfers.
///
/// Every transfer is bounded by [`BusTiming`]; a transfer that runs over is
/// abandoned and reported as [`BusError::Timeout`].
pub struct Ssd1306Bus<I> {
    i2c: I,
    address: u8,
    timing: BusTiming,
    scratch: [u8; MAX_DATA_CHUNK + 1],
}

impl<I: I2c> Ssd1306Bus<I> {
    pub fn new(i2c: I, address: u8, timing: BusTiming) -> Self {
        Self {
            i2c,
            address,
            timing,
            scratch: [0; MAX_DATA_CHUNK + 1],
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> I {
        self.i2c
    }

    async fn transfer(&mut self, len: usize) -> Result<(), BusError> {
        let budget = Duration::from_micros(u64::from(self.timing.budget_us(len)));
        match with_timeout(budget, self.i2c.write(self.address, &self.scratch[..len])).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(classify(e.kind())),
            Err(_) => Err(BusError::Timeout),
        }
    }
}

fn classify(kind: ErrorKind) -> BusError {
    match kind {
        ErrorKind::NoAcknowledge(_) => BusError::Nack,
        _ => BusError::Bus,
    }
}

impl<I: I2c> DisplayBus for Ssd1306Bus<I> {
    async fn write_command(&mut self, byte: u8) -> Result<(), BusError> {
        self.scratch[0] = CONTROL_COMMAND;
        self.scratch[1] = byte;
        self.transfer(2).await
    }

    async fn write_data(&mut self, data: &[u8]) -> Result<(), BusError> {
        for chunk in data.chunks(MAX_DATA_CHUNK) {
            self.scratch[0] = CONTROL_DATA;
            self.scratch[1..=chunk.len()].copy_from_slice(chunk);
            self.transfer(chunk.len() + 1).await?;
        }
        Ok(())
    }
}
