//! Wire encoding of commands, for host tooling and tests.
//!
//! # Example
//!
//! ```
//! use hid_display_proto::CommandBuilder;
//!
//! let mut buf = [0u8; 64];
//! let mut batch = CommandBuilder::new(&mut buf);
//! batch.clear().unwrap();
//! batch.draw_text(0, 0, b"Hi").unwrap();
//! batch.progress_bar(0, 16, 128, 8, 50).unwrap();
//!
//! assert_eq!(
//!     batch.as_bytes(),
//!     &[0x01, 0x02, 0, 0, 2, b'H', b'i', 0x06, 0, 16, 128, 8, 50]
//! );
//! ```

use crate::command::{Command, TestCommand};
use crate::opcode::{Opcode, MAX_FRAME_SIZE, MAX_TEXT_LEN, TEXT_HEADER_LEN};

/// Encoding errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer cannot hold the encoded command.
    BufferTooSmall,
    /// DRAW_TEXT text longer than [`MAX_TEXT_LEN`].
    TextTooLong,
}

impl Command<'_> {
    /// Number of bytes [`Command::encode`] writes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Command::DrawText { text, .. } => TEXT_HEADER_LEN + text.len(),
            Command::Clear => 1,
            Command::SetCursor { .. } => 3,
            Command::ProgressBar { .. } => 6,
            Command::Invert(_) | Command::Brightness(_) | Command::Power(_) | Command::Test(_) => 2,
        }
    }

    /// Encode into `buf`, returning the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        if let Command::DrawText { text, .. } = self {
            if text.len() > MAX_TEXT_LEN {
                return Err(EncodeError::TextTooLong);
            }
        }
        let len = self.encoded_len();
        let out = buf.get_mut(..len).ok_or(EncodeError::BufferTooSmall)?;

        out[0] = self.opcode().as_byte();
        match *self {
            Command::Clear => {}
            Command::DrawText { x, y, text } => {
                out[1] = x;
                out[2] = y;
                // Bounded by MAX_TEXT_LEN above.
                out[3] = text.len() as u8;
                out[TEXT_HEADER_LEN..].copy_from_slice(text);
            }
            Command::SetCursor { x, y } => {
                out[1] = x;
                out[2] = y;
            }
            Command::Invert(flag) | Command::Power(flag) => out[1] = u8::from(flag),
            Command::Brightness(level) => out[1] = level,
            Command::ProgressBar {
                x,
                y,
                width,
                height,
                percent,
            } => out[1..6].copy_from_slice(&[x, y, width, height, percent]),
            Command::Test(t) => out[1] = t.as_byte(),
        }
        Ok(len)
    }

    /// Encode into a fixed-capacity vector sized for one frame.
    pub fn to_vec(&self) -> Result<heapless::Vec<u8, MAX_FRAME_SIZE>, EncodeError> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buf)?;
        heapless::Vec::from_slice(&buf[..len]).map_err(|_| EncodeError::BufferTooSmall)
    }

    /// Encode straight into an [`embedded_io::Write`] sink.
    #[cfg(feature = "embedded-io")]
    pub fn write_to<W: embedded_io::Write>(&self, writer: &mut W) -> Result<usize, W::Error> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        // Text longer than a frame is truncated to what one frame can carry.
        let cmd = match *self {
            Command::DrawText { x, y, text } if text.len() > MAX_TEXT_LEN => Command::DrawText {
                x,
                y,
                text: &text[..MAX_TEXT_LEN],
            },
            other => other,
        };
        let len = cmd.encode(&mut buf).unwrap_or(0);
        writer.write_all(&buf[..len])?;
        Ok(len)
    }
}

/// Appends a batch of commands into one output buffer.
pub struct CommandBuilder<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> CommandBuilder<'a> {
    #[must_use]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Append any command.
    pub fn push(&mut self, cmd: &Command<'_>) -> Result<&mut Self, EncodeError> {
        let written = cmd.encode(&mut self.buf[self.pos..])?;
        self.pos += written;
        Ok(self)
    }

    pub fn clear(&mut self) -> Result<&mut Self, EncodeError> {
        self.push(&Command::Clear)
    }

    pub fn draw_text(&mut self, x: u8, y: u8, text: &[u8]) -> Result<&mut Self, EncodeError> {
        self.push(&Command::DrawText { x, y, text })
    }

    pub fn set_cursor(&mut self, x: u8, y: u8) -> Result<&mut Self, EncodeError> {
        self.push(&Command::SetCursor { x, y })
    }

    pub fn invert(&mut self, on: bool) -> Result<&mut Self, EncodeError> {
        self.push(&Command::Invert(on))
    }

    pub fn brightness(&mut self, level: u8) -> Result<&mut Self, EncodeError> {
        self.push(&Command::Brightness(level))
    }

    pub fn progress_bar(
        &mut self,
        x: u8,
        y: u8,
        width: u8,
        height: u8,
        percent: u8,
    ) -> Result<&mut Self, EncodeError> {
        self.push(&Command::ProgressBar {
            x,
            y,
            width,
            height,
            percent,
        })
    }

    pub fn power(&mut self, on: bool) -> Result<&mut Self, EncodeError> {
        self.push(&Command::Power(on))
    }

    pub fn test(&mut self, cmd: TestCommand) -> Result<&mut Self, EncodeError> {
        self.push(&Command::Test(cmd))
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::CommandFramer;

    #[test]
    fn test_encode_text() {
        let mut buf = [0u8; 16];
        let cmd = Command::DrawText {
            x: 10,
            y: 20,
            text: b"hi!",
        };
        assert_eq!(cmd.encode(&mut buf), Ok(7));
        assert_eq!(&buf[..7], &[0x02, 10, 20, 3, b'h', b'i', b'!']);
    }

    #[test]
    fn test_encode_rejects_long_text() {
        let text = [b'x'; MAX_TEXT_LEN + 1];
        let mut buf = [0u8; 256];
        let cmd = Command::DrawText { x: 0, y: 0, text: &text };
        assert_eq!(cmd.encode(&mut buf), Err(EncodeError::TextTooLong));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buf = [0u8; 5];
        let cmd = Command::ProgressBar {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            percent: 10,
        };
        assert_eq!(cmd.encode(&mut buf), Err(EncodeError::BufferTooSmall));
    }

    #[test]
    fn test_builder_batch_reframes() {
        let mut buf = [0u8; 64];
        let mut batch = CommandBuilder::new(&mut buf);
        batch
            .clear()
            .and_then(|b| b.invert(true))
            .and_then(|b| b.draw_text(0, 8, b"abc"))
            .and_then(|b| b.test(TestCommand::Ping))
            .unwrap();
        assert_eq!(batch.len(), 1 + 2 + 7 + 2);

        let mut framer = CommandFramer::default();
        let opcodes: heapless::Vec<u8, 8> = batch
            .as_bytes()
            .iter()
            .filter_map(|&b| framer.push(b).ok().flatten())
            .map(|f| f.opcode())
            .collect();
        // TEST is rejected without diagnostics enabled.
        assert_eq!(opcodes.as_slice(), &[0x01, 0x04, 0x02]);
    }

    #[test]
    fn test_to_vec() {
        let v = Command::Brightness(0x7F).to_vec().unwrap();
        assert_eq!(v.as_slice(), &[Opcode::Brightness as u8, 0x7F]);
    }
}
