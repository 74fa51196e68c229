//! Non-blocking command framer.
//!
//! Bytes are pushed one at a time as they arrive from the transport. The
//! first byte of a frame is the opcode; the opcode's [`Framing`] rule decides
//! when the frame is complete. A DRAW_TEXT frame whose header has arrived but
//! whose text is still incomplete is force-completed once the partial-frame
//! window elapses (see [`CommandFramer::poll_timeout`]), which bounds latency
//! for stalled or short transfers without ever blocking the caller.

use heapless::Vec;

use crate::opcode::{Framing, Opcode, MAX_FRAME_SIZE, MAX_TEXT_LEN, TEXT_HEADER_LEN};

/// Default partial-frame window in microseconds.
pub const DEFAULT_PARTIAL_TIMEOUT_US: u64 = 5_000;

/// Framing errors. The framer has already reset itself when one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramingError {
    /// The first byte of a frame is not a known (or accepted) opcode.
    UnknownOpcode(u8),
    /// The buffer filled up before the frame completed.
    Overflow,
}

/// Framer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FramerConfig {
    /// How long a DRAW_TEXT frame may wait for its text after the header arrived.
    pub partial_timeout_us: u64,
    /// Accept the TEST opcode (diagnostic builds).
    pub accept_diagnostics: bool,
    /// Legacy shim: a CR or LF among the text bytes completes a DRAW_TEXT frame.
    pub line_terminator: bool,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            partial_timeout_us: DEFAULT_PARTIAL_TIMEOUT_US,
            accept_diagnostics: false,
            line_terminator: false,
        }
    }
}

/// Observable framer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramerState {
    /// No bytes buffered; the next byte is an opcode.
    Idle,
    /// A frame is partially buffered.
    Accumulating {
        opcode: Opcode,
        /// Bytes buffered so far, opcode included.
        received: usize,
        /// Total length needed, if already known.
        required: Option<usize>,
    },
}

/// One complete frame: opcode followed by its positional payload.
///
/// Invariant: never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8, MAX_FRAME_SIZE>,
    forced: bool,
}

impl Frame {
    /// Build a frame from an opcode byte and payload.
    pub fn new(opcode: u8, payload: &[u8]) -> Result<Self, FramingError> {
        let mut bytes = Vec::new();
        bytes.push(opcode).map_err(|_| FramingError::Overflow)?;
        bytes
            .extend_from_slice(payload)
            .map_err(|_| FramingError::Overflow)?;
        Ok(Self {
            bytes,
            forced: false,
        })
    }

    #[inline]
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    /// Payload bytes (everything after the opcode).
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..]
    }

    /// Raw frame bytes, opcode included.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a frame holds at least its opcode.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the frame was completed early (timeout or legacy terminator)
    /// rather than by reaching its required length.
    #[inline]
    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.forced
    }
}

/// Reassembles frames from a byte stream.
///
/// Owns the single in-flight command buffer and its pending-frame timer.
pub struct CommandFramer {
    config: FramerConfig,
    buffer: Vec<u8, MAX_FRAME_SIZE>,
    /// Total frame length, 0 while unknown (DRAW_TEXT before its header).
    required: usize,
    /// Declared text bytes beyond [`MAX_TEXT_LEN`] for the current frame.
    excess: usize,
    /// Clamped text bytes still to be swallowed after the last frame.
    discard: usize,
    deadline_us: Option<u64>,
}

impl CommandFramer {
    #[must_use]
    pub const fn new(config: FramerConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            required: 0,
            excess: 0,
            discard: 0,
            deadline_us: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    /// Bytes of the in-flight frame.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// True while a partial-frame window is running.
    #[inline]
    #[must_use]
    pub fn has_pending_timeout(&self) -> bool {
        self.deadline_us.is_some()
    }

    #[must_use]
    pub fn state(&self) -> FramerState {
        match self.current_opcode() {
            None => FramerState::Idle,
            Some(opcode) => FramerState::Accumulating {
                opcode,
                received: self.buffer.len(),
                required: (self.required != 0).then_some(self.required),
            },
        }
    }

    /// Feed one byte.
    ///
    /// Returns `Ok(Some(frame))` when the byte completes a frame. On error the
    /// partial frame has been discarded and the next byte starts a new frame.
    pub fn push(&mut self, byte: u8) -> Result<Option<Frame>, FramingError> {
        if self.discard > 0 {
            self.discard -= 1;
            return Ok(None);
        }

        if self.buffer.is_empty() {
            let opcode = match Opcode::from_byte(byte) {
                Some(Opcode::Test) if !self.config.accept_diagnostics => None,
                other => other,
            }
            .ok_or(FramingError::UnknownOpcode(byte))?;

            self.buffer.push(byte).map_err(|_| FramingError::Overflow)?;
            self.required = match opcode.framing() {
                Framing::Fixed(len) => len,
                Framing::LengthPrefixed { .. } => 0,
            };
        } else {
            if self.config.line_terminator
                && self.awaiting_text()
                && (byte == b'\r' || byte == b'\n')
            {
                return Ok(Some(self.finish(true)));
            }

            // Unreachable with the current opcode table: every frame is
            // complete by MAX_FRAME_SIZE bytes. Kept as a guard.
            if self.buffer.push(byte).is_err() {
                self.reset();
                return Err(FramingError::Overflow);
            }

            if let Some(Framing::LengthPrefixed { len_offset }) =
                self.current_opcode().map(Opcode::framing)
            {
                if self.buffer.len() == len_offset + 1 {
                    let declared = byte as usize;
                    let len = declared.min(MAX_TEXT_LEN);
                    self.excess = declared - len;
                    self.required = len_offset + 1 + len;
                }
            }
        }

        if self.required != 0 && self.buffer.len() >= self.required {
            Ok(Some(self.finish(false)))
        } else {
            Ok(None)
        }
    }

    /// Run the partial-frame timer.
    ///
    /// Starts the window the first time it sees a DRAW_TEXT frame with a
    /// complete header but missing text, and force-completes that frame with
    /// whatever arrived once `now_us` reaches the deadline.
    pub fn poll_timeout(&mut self, now_us: u64) -> Option<Frame> {
        if !self.awaiting_text() {
            self.deadline_us = None;
            return None;
        }

        match self.deadline_us {
            None => {
                self.deadline_us = Some(now_us.saturating_add(self.config.partial_timeout_us));
                None
            }
            Some(deadline) if now_us >= deadline => Some(self.finish(true)),
            Some(_) => None,
        }
    }

    /// Transport disconnected: drop everything without dispatching.
    pub fn cancel(&mut self) {
        self.reset();
        self.discard = 0;
    }

    fn current_opcode(&self) -> Option<Opcode> {
        self.buffer.first().copied().and_then(Opcode::from_byte)
    }

    /// Length-prefixed frame with its header in, text still incomplete.
    fn awaiting_text(&self) -> bool {
        matches!(self.current_opcode(), Some(Opcode::DrawText))
            && self.buffer.len() >= TEXT_HEADER_LEN
            && self.buffer.len() < self.required
    }

    fn finish(&mut self, forced: bool) -> Frame {
        let frame = Frame {
            bytes: core::mem::take(&mut self.buffer),
            forced,
        };
        // A forced frame ends the declared text; whatever follows is a new frame.
        self.discard = if forced { 0 } else { self.excess };
        self.reset();
        frame
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.required = 0;
        self.excess = 0;
        self.deadline_us = None;
    }
}

impl Default for CommandFramer {
    fn default() -> Self {
        Self::new(FramerConfig::default())
    }
}
