//! Display engine: framebuffer, cursor, health and drawing primitives.
//!
//! The framebuffer mirrors the controller's RAM layout: 8 pages of 8 pixel
//! rows each, one byte per column per page, bit 0 at the top of the page.
//! Every primitive updates the framebuffer first and then flushes the
//! touched region with one or more bus transactions. The first failing
//! transaction aborts the rest of the primitive and marks the display
//! unhealthy; the framebuffer keeps whatever was already written.

use crate::bus::{cmd, BusError, DisplayBus, INIT_SEQUENCE};
use crate::font::{glyph, GLYPH_SIZE};

/// Panel width in pixels.
pub const WIDTH: usize = 128;
/// Panel height in pixels.
pub const HEIGHT: usize = 64;
/// Number of 8-row pages.
pub const PAGES: usize = HEIGHT / 8;
/// Framebuffer size in bytes.
pub const FRAMEBUFFER_SIZE: usize = WIDTH * PAGES;

const GLYPH: u8 = GLYPH_SIZE as u8;

/// Physical mounting of the panel, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Orientation {
    #[default]
    Normal,
    /// Panel mounted upside down; all rendering is mirrored on both axes.
    Rotated180,
}

impl Orientation {
    /// Cursor position after a clear.
    #[must_use]
    pub const fn home(self) -> (u8, u8) {
        match self {
            Self::Normal => (0, 0),
            Self::Rotated180 => (0, (HEIGHT - GLYPH_SIZE) as u8),
        }
    }

    /// Transpose a row-major glyph into 8 column bytes in page layout.
    ///
    /// Normal: glyph bit `(row, col)` becomes bit `row` of byte `col`.
    /// Rotated180: it becomes bit `7 - row` of byte `7 - col`.
    #[must_use]
    pub fn rasterize(self, rows: &[u8; GLYPH_SIZE]) -> [u8; GLYPH_SIZE] {
        let mut columns = [0u8; GLYPH_SIZE];
        for (row, &bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                match self {
                    Self::Normal => columns[col] |= 1 << row,
                    Self::Rotated180 => columns[7 - col] |= 1 << (7 - row),
                }
            }
        }
        columns
    }
}

/// Owns the framebuffer and drives the controller through a [`DisplayBus`].
pub struct DisplayEngine<B> {
    bus: B,
    orientation: Orientation,
    framebuffer: [u8; FRAMEBUFFER_SIZE],
    cursor: (u8, u8),
    healthy: bool,
}

impl<B: DisplayBus> DisplayEngine<B> {
    /// Create an engine with a blank framebuffer. No transaction is issued.
    pub fn new(bus: B, orientation: Orientation) -> Self {
        Self {
            bus,
            orientation,
            framebuffer: [0; FRAMEBUFFER_SIZE],
            cursor: orientation.home(),
            healthy: true,
        }
    }

    /// Run the controller power-up sequence, then clear the panel.
    pub async fn init(&mut self) -> Result<(), BusError> {
        for &byte in INIT_SEQUENCE {
            self.command(byte).await?;
        }
        self.clear().await
    }

    /// Blank the framebuffer and the panel, and home the cursor.
    pub async fn clear(&mut self) -> Result<(), BusError> {
        self.framebuffer.fill(0);
        self.cursor = self.orientation.home();

        self.window(0, (PAGES - 1) as u8, 0, (WIDTH - 1) as u8)
            .await?;
        self.flush(0..FRAMEBUFFER_SIZE).await
    }

    /// Draw `text` starting at `(x, y)` in logical coordinates.
    ///
    /// Each glyph is flushed with its own transaction. Glyphs that would not
    /// fit on the panel at the cursor are skipped without advancing it.
    pub async fn draw_text(&mut self, x: u8, y: u8, text: &[u8]) -> Result<(), BusError> {
        match self.orientation {
            Orientation::Normal => {
                self.cursor = (x, y);
                for &ch in text {
                    self.draw_glyph(ch).await?;
                }
            }
            Orientation::Rotated180 => {
                let y = (HEIGHT - GLYPH_SIZE).saturating_sub(y as usize);
                let span = GLYPH_SIZE.saturating_mul(text.len());
                let x = WIDTH.saturating_sub(x as usize).saturating_sub(span);
                self.cursor = (x as u8, y as u8);
                for &ch in text.iter().rev() {
                    self.draw_glyph(ch).await?;
                }
            }
        }
        Ok(())
    }

    async fn draw_glyph(&mut self, ch: u8) -> Result<(), BusError> {
        let (col, y) = self.cursor;
        let page = y / 8;
        if page as usize >= PAGES || col as usize > WIDTH - GLYPH_SIZE {
            return Ok(());
        }

        let start = page as usize * WIDTH + col as usize;
        let columns = self.orientation.rasterize(glyph(ch));
        self.framebuffer[start..start + GLYPH_SIZE].copy_from_slice(&columns);

        self.window(page, page, col, col + GLYPH - 1).await?;
        self.flush(start..start + GLYPH_SIZE).await?;

        self.advance();
        Ok(())
    }

    fn advance(&mut self) {
        let (mut x, mut y) = self.cursor;
        x += GLYPH;
        if x as usize > WIDTH - GLYPH_SIZE {
            x = 0;
            y += GLYPH;
            if y as usize >= HEIGHT {
                y = 0;
            }
        }
        self.cursor = (x, y);
    }

    /// Move the cursor. No transaction.
    pub fn set_cursor(&mut self, x: u8, y: u8) {
        self.cursor = (x, y);
    }

    pub async fn invert(&mut self, on: bool) -> Result<(), BusError> {
        self.command(if on {
            cmd::INVERT_DISPLAY
        } else {
            cmd::NORMAL_DISPLAY
        })
        .await
    }

    pub async fn power(&mut self, on: bool) -> Result<(), BusError> {
        self.command(if on { cmd::DISPLAY_ON } else { cmd::DISPLAY_OFF })
            .await
    }

    pub async fn set_brightness(&mut self, level: u8) -> Result<(), BusError> {
        self.command(cmd::SET_CONTRAST).await?;
        self.command(level).await
    }

    /// Draw a bordered bar `percent` full.
    ///
    /// The rectangle is clipped to the panel; bars narrower or shorter than
    /// 2 px after clipping, or starting off-panel, draw nothing. Pixels
    /// outside the rectangle are preserved. One transaction per page.
    pub async fn draw_progress_bar(
        &mut self,
        x: u8,
        y: u8,
        width: u8,
        height: u8,
        percent: u8,
    ) -> Result<(), BusError> {
        let (mut x, mut y) = (x as usize, y as usize);
        let (mut w, mut h) = (width as usize, height as usize);

        if self.orientation == Orientation::Rotated180 {
            x = WIDTH.saturating_sub(w).saturating_sub(x);
            y = HEIGHT.saturating_sub(h).saturating_sub(y);
        }

        let percent = percent.min(100) as usize;
        if x >= WIDTH || y >= HEIGHT {
            return Ok(());
        }
        w = w.min(WIDTH - x);
        h = h.min(HEIGHT - y);
        if w < 2 || h < 2 {
            return Ok(());
        }

        let filled = w * percent / 100;
        let (left, right) = (x, x + w - 1);
        let (top, bottom) = (y, y + h - 1);
        let orientation = self.orientation;
        let is_filled = |col: usize| match orientation {
            Orientation::Normal => col < x + filled,
            Orientation::Rotated180 => col >= x + w - filled,
        };

        let first_page = top / 8;
        let last_page = bottom / 8;
        for page in first_page..=last_page {
            for col in left..=right {
                let mut mask = 0u8;
                let mut set = 0u8;
                for bit in 0..8 {
                    let py = page * 8 + bit;
                    if py < top || py > bottom {
                        continue;
                    }
                    mask |= 1 << bit;
                    let border = col == left || col == right || py == top || py == bottom;
                    if border || is_filled(col) {
                        set |= 1 << bit;
                    }
                }
                let byte = &mut self.framebuffer[page * WIDTH + col];
                *byte = (*byte & !mask) | set;
            }
        }

        for page in first_page..=last_page {
            self.window(page as u8, page as u8, left as u8, right as u8)
                .await?;
            let start = page * WIDTH + left;
            self.flush(start..start + w).await?;
        }
        Ok(())
    }

    /// Set the controller's page and column address window.
    async fn window(
        &mut self,
        first_page: u8,
        last_page: u8,
        first_col: u8,
        last_col: u8,
    ) -> Result<(), BusError> {
        for byte in [
            cmd::PAGE_ADDR,
            first_page,
            last_page,
            cmd::COLUMN_ADDR,
            first_col,
            last_col,
        ] {
            self.command(byte).await?;
        }
        Ok(())
    }

    async fn command(&mut self, byte: u8) -> Result<(), BusError> {
        let result = self.bus.write_command(byte).await;
        self.healthy = result.is_ok();
        result
    }

    async fn flush(&mut self, range: core::ops::Range<usize>) -> Result<(), BusError> {
        let result = self.bus.write_data(&self.framebuffer[range]).await;
        self.healthy = result.is_ok();
        result
    }

    #[inline]
    #[must_use]
    pub fn framebuffer(&self) -> &[u8; FRAMEBUFFER_SIZE] {
        &self.framebuffer
    }

    /// Cursor position in framebuffer coordinates.
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> (u8, u8) {
        self.cursor
    }

    /// False if the most recent transaction failed.
    #[inline]
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    #[inline]
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }
}
