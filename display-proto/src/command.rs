//! Decoding of complete frames into typed commands.

use crate::framer::Frame;
use crate::opcode::{test_subcmd, Opcode};

/// A decoded display command. Text is borrowed from the frame it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    Clear,
    DrawText { x: u8, y: u8, text: &'a [u8] },
    SetCursor { x: u8, y: u8 },
    Invert(bool),
    Brightness(u8),
    ProgressBar {
        x: u8,
        y: u8,
        width: u8,
        height: u8,
        percent: u8,
    },
    Power(bool),
    Test(TestCommand),
}

/// Diagnostic subcommands carried by the TEST opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestCommand {
    /// Echo `[F0, 00]` back to the host.
    Ping,
    RotateCw,
    RotateCcw,
    /// Button press immediately followed by release.
    ButtonPress,
    NavUp,
    NavDown,
    NavLeft,
    NavRight,
}

impl TestCommand {
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            test_subcmd::PING => Self::Ping,
            test_subcmd::ROTATE_CW => Self::RotateCw,
            test_subcmd::ROTATE_CCW => Self::RotateCcw,
            test_subcmd::BUTTON_PRESS => Self::ButtonPress,
            test_subcmd::NAV_UP => Self::NavUp,
            test_subcmd::NAV_DOWN => Self::NavDown,
            test_subcmd::NAV_LEFT => Self::NavLeft,
            test_subcmd::NAV_RIGHT => Self::NavRight,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Ping => test_subcmd::PING,
            Self::RotateCw => test_subcmd::ROTATE_CW,
            Self::RotateCcw => test_subcmd::ROTATE_CCW,
            Self::ButtonPress => test_subcmd::BUTTON_PRESS,
            Self::NavUp => test_subcmd::NAV_UP,
            Self::NavDown => test_subcmd::NAV_DOWN,
            Self::NavLeft => test_subcmd::NAV_LEFT,
            Self::NavRight => test_subcmd::NAV_RIGHT,
        }
    }
}

/// Reply written back for [`TestCommand::Ping`].
pub const PING_REPLY: [u8; 2] = [Opcode::Test as u8, test_subcmd::PING];

/// Why a frame could not be turned into a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    UnknownOpcode(u8),
    /// Payload shorter than the opcode's minimum (only reachable through a forced frame).
    Truncated(Opcode),
    UnknownSubcommand(u8),
}

impl<'a> Command<'a> {
    /// Decode a complete frame.
    ///
    /// For DRAW_TEXT the text is `min(len, bytes present after the header)`
    /// bytes, so force-completed frames decode to whatever text arrived.
    pub fn from_frame(frame: &'a Frame) -> Result<Self, DecodeError> {
        let opcode =
            Opcode::from_byte(frame.opcode()).ok_or(DecodeError::UnknownOpcode(frame.opcode()))?;
        let p = frame.payload();
        if p.len() < opcode.min_payload_len() {
            return Err(DecodeError::Truncated(opcode));
        }

        Ok(match opcode {
            Opcode::Clear => Command::Clear,
            Opcode::DrawText => {
                let text = &p[3..];
                let len = (p[2] as usize).min(text.len());
                Command::DrawText {
                    x: p[0],
                    y: p[1],
                    text: &text[..len],
                }
            }
            Opcode::SetCursor => Command::SetCursor { x: p[0], y: p[1] },
            Opcode::Invert => Command::Invert(p[0] != 0),
            Opcode::Brightness => Command::Brightness(p[0]),
            Opcode::ProgressBar => Command::ProgressBar {
                x: p[0],
                y: p[1],
                width: p[2],
                height: p[3],
                percent: p[4],
            },
            Opcode::Power => Command::Power(p[0] != 0),
            Opcode::Test => Command::Test(
                TestCommand::from_byte(p[0]).ok_or(DecodeError::UnknownSubcommand(p[0]))?,
            ),
        })
    }

    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Command::Clear => Opcode::Clear,
            Command::DrawText { .. } => Opcode::DrawText,
            Command::SetCursor { .. } => Opcode::SetCursor,
            Command::Invert(_) => Opcode::Invert,
            Command::Brightness(_) => Opcode::Brightness,
            Command::ProgressBar { .. } => Opcode::ProgressBar,
            Command::Power(_) => Opcode::Power,
            Command::Test(_) => Opcode::Test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bytes: &[u8]) -> Frame {
        Frame::new(bytes[0], &bytes[1..]).unwrap()
    }

    #[test]
    fn test_decode_fixed_commands() {
        assert_eq!(Command::from_frame(&frame(&[0x01])), Ok(Command::Clear));
        assert_eq!(
            Command::from_frame(&frame(&[0x03, 8, 16])),
            Ok(Command::SetCursor { x: 8, y: 16 })
        );
        assert_eq!(
            Command::from_frame(&frame(&[0x04, 2])),
            Ok(Command::Invert(true))
        );
        assert_eq!(
            Command::from_frame(&frame(&[0x05, 0xCF])),
            Ok(Command::Brightness(0xCF))
        );
        assert_eq!(
            Command::from_frame(&frame(&[0x06, 1, 2, 3, 4, 5])),
            Ok(Command::ProgressBar {
                x: 1,
                y: 2,
                width: 3,
                height: 4,
                percent: 5
            })
        );
        assert_eq!(
            Command::from_frame(&frame(&[0x07, 0])),
            Ok(Command::Power(false))
        );
    }

    #[test]
    fn test_decode_text_uses_declared_length() {
        let f = frame(&[0x02, 4, 8, 2, b'o', b'k']);
        assert_eq!(
            Command::from_frame(&f),
            Ok(Command::DrawText {
                x: 4,
                y: 8,
                text: b"ok"
            })
        );
    }

    #[test]
    fn test_decode_forced_text_uses_received_bytes() {
        let f = frame(&[0x02, 0, 0, 5, b'h', b'i']);
        assert_eq!(
            Command::from_frame(&f),
            Ok(Command::DrawText {
                x: 0,
                y: 0,
                text: b"hi"
            })
        );
    }

    #[test]
    fn test_decode_truncated_frames() {
        assert_eq!(
            Command::from_frame(&frame(&[0x02, 0, 0])),
            Err(DecodeError::Truncated(Opcode::DrawText))
        );
        assert_eq!(
            Command::from_frame(&frame(&[0x06, 0, 0, 10])),
            Err(DecodeError::Truncated(Opcode::ProgressBar))
        );
        assert_eq!(
            Command::from_frame(&frame(&[0x05])),
            Err(DecodeError::Truncated(Opcode::Brightness))
        );
    }

    #[test]
    fn test_decode_unknown() {
        assert_eq!(
            Command::from_frame(&frame(&[0x99])),
            Err(DecodeError::UnknownOpcode(0x99))
        );
        assert_eq!(
            Command::from_frame(&frame(&[0xF0, 0x42])),
            Err(DecodeError::UnknownSubcommand(0x42))
        );
    }

    #[test]
    fn test_decode_test_subcommands() {
        for byte in 0x00..=0x07 {
            let f = frame(&[0xF0, byte]);
            let cmd = Command::from_frame(&f).unwrap();
            match cmd {
                Command::Test(t) => assert_eq!(t.as_byte(), byte),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(PING_REPLY, [0xF0, 0x00]);
    }
}
