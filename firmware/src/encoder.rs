//! Rotary encoder and push-button inputs.

use defmt::debug;
use embassy_rp::gpio::Input;
use embassy_time::{with_timeout, Duration, Timer};
use embedded_hal::digital::InputPin;
use hid_display_core::{PointerPins, PointerSample};
use portable_atomic::{AtomicBool, Ordering};

/// Settle time after a switch edge.
pub const BUTTON_DEBOUNCE: Duration = Duration::from_millis(5);
/// Re-sample interval if an edge is missed.
pub const BUTTON_RESAMPLE: Duration = Duration::from_millis(50);

/// Encoder CLK/DT pins plus the debounced button flag.
///
/// Pins are pulled up; `clk`/`dt` are read as raw levels, the flag is
/// already active-high.
pub struct EncoderPins<C, D> {
    clk: C,
    dt: D,
    button: &'static AtomicBool,
}

impl<C: InputPin, D: InputPin> EncoderPins<C, D> {
    pub fn new(clk: C, dt: D, button: &'static AtomicBool) -> Self {
        Self { clk, dt, button }
    }
}

impl<C: InputPin, D: InputPin> PointerPins for EncoderPins<C, D> {
    fn sample(&mut self) -> PointerSample {
        PointerSample {
            clk: matches!(self.clk.is_high(), Ok(true)),
            dt: matches!(self.dt.is_high(), Ok(true)),
            button: self.button.load(Ordering::Acquire),
        }
    }
}

/// Track the active-low switch on `pin` into `pressed`. Sole writer of the flag.
pub async fn watch_button(pin: &mut Input<'static>, pressed: &'static AtomicBool) -> ! {
    pressed.store(pin.is_low(), Ordering::Release);
    loop {
        if with_timeout(BUTTON_RESAMPLE, pin.wait_for_any_edge()).await.is_ok() {
            Timer::after(BUTTON_DEBOUNCE).await;
        }
        let down = pin.is_low();
        if pressed.swap(down, Ordering::AcqRel) != down {
            debug!("button {}", if down { "down" } else { "up" });
        }
    }
}
