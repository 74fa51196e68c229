//! Opcode table and per-opcode framing rules.

/// Maximum size of a single frame, opcode byte included.
pub const MAX_FRAME_SIZE: usize = 128;

/// Header length of a DRAW_TEXT frame: `[opcode][x][y][len]`.
pub const TEXT_HEADER_LEN: usize = 4;

/// Longest text a single DRAW_TEXT frame can carry.
pub const MAX_TEXT_LEN: usize = MAX_FRAME_SIZE - TEXT_HEADER_LEN;

/// Offset of the length byte inside a DRAW_TEXT frame.
pub const TEXT_LEN_OFFSET: usize = 3;

/// Protocol opcodes (first byte of every frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// `[01]`
    Clear = 0x01,
    /// `[02][x][y][len][text*len]`
    DrawText = 0x02,
    /// `[03][x][y]`
    SetCursor = 0x03,
    /// `[04][0|1]`
    Invert = 0x04,
    /// `[05][level]`
    Brightness = 0x05,
    /// `[06][x][y][w][h][pct]`
    ProgressBar = 0x06,
    /// `[07][0|1]`
    Power = 0x07,
    /// `[F0][subcmd]`, only accepted by diagnostic builds.
    Test = 0xF0,
}

impl Opcode {
    /// Look up an opcode from its wire byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => Self::Clear,
            0x02 => Self::DrawText,
            0x03 => Self::SetCursor,
            0x04 => Self::Invert,
            0x05 => Self::Brightness,
            0x06 => Self::ProgressBar,
            0x07 => Self::Power,
            0xF0 => Self::Test,
            _ => return None,
        })
    }

    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Framing rule used to decide when a frame with this opcode is complete.
    #[must_use]
    pub const fn framing(self) -> Framing {
        match self {
            Self::Clear => Framing::Fixed(1),
            Self::DrawText => Framing::LengthPrefixed {
                len_offset: TEXT_LEN_OFFSET,
            },
            Self::SetCursor => Framing::Fixed(3),
            Self::Invert | Self::Brightness | Self::Power | Self::Test => Framing::Fixed(2),
            Self::ProgressBar => Framing::Fixed(6),
        }
    }

    /// Minimum number of payload bytes (after the opcode) needed to decode a command.
    #[must_use]
    pub const fn min_payload_len(self) -> usize {
        match self.framing() {
            Framing::Fixed(total) => total - 1,
            Framing::LengthPrefixed { len_offset } => len_offset,
        }
    }
}

/// How the framer decides a frame is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Framing {
    /// The frame is exactly this many bytes long, opcode included.
    Fixed(usize),
    /// The byte at `len_offset` gives the number of trailing bytes after the header.
    LengthPrefixed { len_offset: usize },
}

/// TEST subcommand bytes.
pub mod test_subcmd {
    pub const PING: u8 = 0x00;
    pub const ROTATE_CW: u8 = 0x01;
    pub const ROTATE_CCW: u8 = 0x02;
    pub const BUTTON_PRESS: u8 = 0x03;
    pub const NAV_UP: u8 = 0x04;
    pub const NAV_DOWN: u8 = 0x05;
    pub const NAV_LEFT: u8 = 0x06;
    pub const NAV_RIGHT: u8 = 0x07;
}
