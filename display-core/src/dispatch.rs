//! Maps a completed frame onto a display engine call.

use hid_display_proto::{Command, DecodeError, Frame, Opcode, TestCommand};

use crate::bus::{BusError, DisplayBus};
use crate::engine::DisplayEngine;

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatched {
    /// The display command ran to completion.
    Drawn(Opcode),
    /// The display command was aborted by a bus failure.
    BusFailed(Opcode, BusError),
    /// The frame did not decode; nothing was done.
    Ignored(DecodeError),
    /// A diagnostic command for the caller to act on.
    Diagnostic(TestCommand),
}

/// Decode `frame` and run it against `engine`.
pub async fn dispatch<B: DisplayBus>(engine: &mut DisplayEngine<B>, frame: &Frame) -> Dispatched {
    let cmd = match Command::from_frame(frame) {
        Ok(cmd) => cmd,
        Err(e) => return Dispatched::Ignored(e),
    };

    let result = match cmd {
        Command::Clear => engine.clear().await,
        Command::DrawText { x, y, text } => engine.draw_text(x, y, text).await,
        Command::SetCursor { x, y } => {
            engine.set_cursor(x, y);
            Ok(())
        }
        Command::Invert(on) => engine.invert(on).await,
        Command::Brightness(level) => engine.set_brightness(level).await,
        Command::ProgressBar {
            x,
            y,
            width,
            height,
            percent,
        } => engine.draw_progress_bar(x, y, width, height, percent).await,
        Command::Power(on) => engine.power(on).await,
        Command::Test(t) => return Dispatched::Diagnostic(t),
    };

    match result {
        Ok(()) => Dispatched::Drawn(cmd.opcode()),
        Err(e) => Dispatched::BusFailed(cmd.opcode(), e),
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::engine::tests::{MockBus, Tx};
    use crate::engine::Orientation;
    use crate::testing::block_on;
    use std::vec;

    fn frame(bytes: &[u8]) -> Frame {
        Frame::new(bytes[0], &bytes[1..]).unwrap()
    }

    #[test]
    fn test_text_frame_draws() {
        let mut e = DisplayEngine::new(MockBus::default(), Orientation::Normal);
        let out = block_on(dispatch(&mut e, &frame(&[0x02, 10, 20, 3, b'h', b'i', b'!'])));
        assert_eq!(out, Dispatched::Drawn(Opcode::DrawText));
        assert_eq!(e.bus().data().len(), 3);
        assert_eq!(e.cursor(), (34, 20));
    }

    #[test]
    fn test_set_cursor_issues_no_transaction() {
        let mut e = DisplayEngine::new(MockBus::default(), Orientation::Normal);
        let out = block_on(dispatch(&mut e, &frame(&[0x03, 16, 8])));
        assert_eq!(out, Dispatched::Drawn(Opcode::SetCursor));
        assert!(e.bus().log.is_empty());
        assert_eq!(e.cursor(), (16, 8));
    }

    #[test]
    fn test_flags_treat_nonzero_as_true() {
        let mut e = DisplayEngine::new(MockBus::default(), Orientation::Normal);
        block_on(dispatch(&mut e, &frame(&[0x04, 0x10])));
        block_on(dispatch(&mut e, &frame(&[0x07, 0x00])));
        block_on(dispatch(&mut e, &frame(&[0x05, 0x20])));
        assert_eq!(
            e.bus().log,
            vec![
                Tx::Command(0xA7),
                Tx::Command(0xAE),
                Tx::Command(0x81),
                Tx::Command(0x20)
            ]
        );
    }

    #[test]
    fn test_power_failure_reported() {
        let mut e = DisplayEngine::new(MockBus::failing_at(0), Orientation::Normal);
        let out = block_on(dispatch(&mut e, &frame(&[0x07, 0])));
        assert_eq!(out, Dispatched::BusFailed(Opcode::Power, BusError::Nack));
        assert!(!e.is_healthy());
        assert_eq!(e.bus().attempts, 1);
    }

    #[test]
    fn test_truncated_frame_is_noop() {
        let mut e = DisplayEngine::new(MockBus::default(), Orientation::Normal);
        let out = block_on(dispatch(&mut e, &frame(&[0x06, 0, 0])));
        assert_eq!(out, Dispatched::Ignored(DecodeError::Truncated(Opcode::ProgressBar)));
        assert!(e.bus().log.is_empty());
        assert!(e.framebuffer().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_diagnostic_passed_to_caller() {
        let mut e = DisplayEngine::new(MockBus::default(), Orientation::Normal);
        let out = block_on(dispatch(&mut e, &frame(&[0xF0, 0x03])));
        assert_eq!(out, Dispatched::Diagnostic(TestCommand::ButtonPress));
        assert!(e.bus().log.is_empty());
    }
}
