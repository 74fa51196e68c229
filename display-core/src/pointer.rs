//! Pointer subsystem: rotary encoder and push button to relative mouse reports.

use core::future::Future;

use hid_display_proto::TestCommand;

/// Horizontal step reported per encoder detent.
pub const ROTATION_STEP: i8 = 5;

/// Minimum spacing between two accepted encoder transitions.
pub const ROTATION_DEBOUNCE_US: u64 = 5_000;

/// Primary button bit in [`PointerReport::buttons`].
pub const BUTTON_PRIMARY: u8 = 0x01;

/// One relative mouse report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointerReport {
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
}

impl PointerReport {
    #[inline]
    #[must_use]
    pub const fn buttons(buttons: u8) -> Self {
        Self {
            buttons,
            x: 0,
            y: 0,
            wheel: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn motion(buttons: u8, x: i8, y: i8) -> Self {
        Self {
            buttons,
            x,
            y,
            wheel: 0,
        }
    }
}

/// One read of the encoder pins and the (debounced, active-high) button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointerSample {
    pub clk: bool,
    pub dt: bool,
    pub button: bool,
}

impl PointerSample {
    #[inline]
    fn phase(self) -> u8 {
        (u8::from(self.clk) << 1) | u8::from(self.dt)
    }
}

/// Direction of one quadrature step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Decode a Gray-code transition between two `(clk << 1) | dt` phases.
    #[must_use]
    pub const fn from_phases(last: u8, current: u8) -> Option<Self> {
        match (last, current) {
            (0b00, 0b01) | (0b01, 0b11) | (0b11, 0b10) | (0b10, 0b00) => Some(Self::Clockwise),
            (0b00, 0b10) | (0b10, 0b11) | (0b11, 0b01) | (0b01, 0b00) => {
                Some(Self::CounterClockwise)
            }
            _ => None,
        }
    }

    /// Horizontal motion for this step: clockwise moves left.
    #[must_use]
    pub const fn dx(self) -> i8 {
        match self {
            Self::Clockwise => -ROTATION_STEP,
            Self::CounterClockwise => ROTATION_STEP,
        }
    }
}

/// Turns successive [`PointerSample`]s into reports.
///
/// A button change is reported before any rotation seen in the same sample;
/// the rotation is picked up on the next poll.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    last_phase: u8,
    reported_button: bool,
    last_rotation_us: Option<u64>,
}

impl PointerTracker {
    /// Start tracking from the pins' current state.
    #[must_use]
    pub fn new(initial: PointerSample) -> Self {
        Self {
            last_phase: initial.phase(),
            reported_button: initial.button,
            last_rotation_us: None,
        }
    }

    pub fn update(&mut self, sample: PointerSample, now_us: u64) -> Option<PointerReport> {
        if sample.button != self.reported_button {
            self.reported_button = sample.button;
            return Some(PointerReport::buttons(self.button_bits()));
        }

        let phase = sample.phase();
        if phase == self.last_phase {
            return None;
        }
        let last = core::mem::replace(&mut self.last_phase, phase);

        if let Some(prev) = self.last_rotation_us {
            if now_us.saturating_sub(prev) < ROTATION_DEBOUNCE_US {
                return None;
            }
        }
        self.last_rotation_us = Some(now_us);

        Rotation::from_phases(last, phase)
            .map(|rotation| PointerReport::motion(self.button_bits(), rotation.dx(), 0))
    }

    fn button_bits(&self) -> u8 {
        if self.reported_button {
            BUTTON_PRIMARY
        } else {
            0
        }
    }
}

const STEP_LEFT: [PointerReport; 1] = [PointerReport::motion(0, -ROTATION_STEP, 0)];
const STEP_RIGHT: [PointerReport; 1] = [PointerReport::motion(0, ROTATION_STEP, 0)];
const STEP_UP: [PointerReport; 1] = [PointerReport::motion(0, 0, -ROTATION_STEP)];
const STEP_DOWN: [PointerReport; 1] = [PointerReport::motion(0, 0, ROTATION_STEP)];
const CLICK: [PointerReport; 2] = [
    PointerReport::buttons(BUTTON_PRIMARY),
    PointerReport::buttons(0),
];

/// Reports produced by a diagnostic command, in send order.
#[must_use]
pub fn test_reports(cmd: TestCommand) -> &'static [PointerReport] {
    match cmd {
        TestCommand::Ping => &[],
        TestCommand::RotateCw | TestCommand::NavLeft => &STEP_LEFT,
        TestCommand::RotateCcw | TestCommand::NavRight => &STEP_RIGHT,
        TestCommand::ButtonPress => &CLICK,
        TestCommand::NavUp => &STEP_UP,
        TestCommand::NavDown => &STEP_DOWN,
    }
}

/// Reads the encoder and button pins.
pub trait PointerPins {
    fn sample(&mut self) -> PointerSample;
}

/// Non-blocking source of pointer reports, polled once per tick.
pub trait PointerSource {
    fn poll(&mut self, now_us: u64) -> Option<PointerReport>;
}

/// [`PointerSource`] over a set of encoder pins.
pub struct EncoderPointer<P> {
    pins: P,
    tracker: PointerTracker,
}

impl<P: PointerPins> EncoderPointer<P> {
    pub fn new(mut pins: P) -> Self {
        let tracker = PointerTracker::new(pins.sample());
        Self { pins, tracker }
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }
}

impl<P: PointerPins> PointerSource for EncoderPointer<P> {
    fn poll(&mut self, now_us: u64) -> Option<PointerReport> {
        let sample = self.pins.sample();
        self.tracker.update(sample, now_us)
    }
}

/// Error type for pointer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PointerError {
    /// Host has not configured the HID interface yet.
    NotReady,
    /// Endpoint write failed.
    Io,
}

/// Destination for pointer reports (USB HID mouse in firmware).
pub trait PointerSink {
    fn send(&mut self, report: &PointerReport) -> impl Future<Output = Result<(), PointerError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(clk: bool, dt: bool, button: bool) -> PointerSample {
        PointerSample { clk, dt, button }
    }

    #[test]
    fn test_gray_code_directions() {
        for (a, b) in [(0b00, 0b01), (0b01, 0b11), (0b11, 0b10), (0b10, 0b00)] {
            assert_eq!(Rotation::from_phases(a, b), Some(Rotation::Clockwise));
            assert_eq!(Rotation::from_phases(b, a), Some(Rotation::CounterClockwise));
        }
        assert_eq!(Rotation::from_phases(0b00, 0b11), None);
        assert_eq!(Rotation::from_phases(0b01, 0b10), None);
    }

    #[test]
    fn test_clockwise_moves_left() {
        let mut t = PointerTracker::new(sample(false, false, false));
        assert_eq!(
            t.update(sample(false, true, false), 10_000),
            Some(PointerReport::motion(0, -5, 0))
        );
        assert_eq!(
            t.update(sample(true, true, false), 20_000),
            Some(PointerReport::motion(0, -5, 0))
        );
    }

    #[test]
    fn test_counter_clockwise_moves_right() {
        let mut t = PointerTracker::new(sample(false, false, false));
        assert_eq!(
            t.update(sample(true, false, false), 0),
            Some(PointerReport::motion(0, 5, 0))
        );
    }

    #[test]
    fn test_rotation_debounce() {
        let mut t = PointerTracker::new(sample(false, false, false));
        assert!(t.update(sample(false, true, false), 100).is_some());
        // Bounce within the window only tracks the pins.
        assert_eq!(t.update(sample(true, true, false), 2_000), None);
        assert_eq!(t.update(sample(true, true, false), 9_000), None);
        assert!(t.update(sample(true, false, false), 9_000).is_some());
    }

    #[test]
    fn test_unchanged_pins_report_nothing() {
        let mut t = PointerTracker::new(sample(true, true, false));
        assert_eq!(t.update(sample(true, true, false), 0), None);
        assert_eq!(t.update(sample(true, true, false), 1_000_000), None);
    }

    #[test]
    fn test_button_reported_before_rotation() {
        let mut t = PointerTracker::new(sample(false, false, false));
        assert_eq!(
            t.update(sample(false, true, true), 0),
            Some(PointerReport::buttons(1))
        );
        assert_eq!(
            t.update(sample(false, true, true), 0),
            Some(PointerReport::motion(1, -5, 0))
        );
        assert_eq!(
            t.update(sample(false, true, false), 0),
            Some(PointerReport::buttons(0))
        );
    }

    #[test]
    fn test_initial_button_state_is_not_reported() {
        let mut t = PointerTracker::new(sample(false, false, true));
        assert_eq!(t.update(sample(false, false, true), 0), None);
    }

    #[test]
    fn test_diagnostic_reports() {
        assert!(test_reports(TestCommand::Ping).is_empty());
        assert_eq!(test_reports(TestCommand::RotateCw)[0].x, -5);
        assert_eq!(test_reports(TestCommand::RotateCcw)[0].x, 5);
        assert_eq!(test_reports(TestCommand::NavUp)[0].y, -5);
        assert_eq!(test_reports(TestCommand::NavDown)[0].y, 5);
        assert_eq!(
            test_reports(TestCommand::ButtonPress),
            &[PointerReport::buttons(1), PointerReport::buttons(0)]
        );
    }

    struct FixedPins(PointerSample);

    impl PointerPins for FixedPins {
        fn sample(&mut self) -> PointerSample {
            self.0
        }
    }

    #[test]
    fn test_encoder_pointer_polls_pins() {
        let mut pointer = EncoderPointer::new(FixedPins(sample(false, false, false)));
        assert_eq!(pointer.poll(0), None);
        pointer.pins_mut().0 = sample(true, false, false);
        assert_eq!(pointer.poll(0), Some(PointerReport::motion(0, 5, 0)));
    }
}
