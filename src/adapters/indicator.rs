//! embedded-hal indicator adapter.
//!
//! Drives one annunciator channel through an `embedded-hal` `OutputPin`
//! plus a `DelayNs` for blink timing. Blink patterns run synchronously on
//! the caller's thread; patterns are short (panel feedback), and channels
//! that need long autonomous patterns wrap this in their own task.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::BlinkPattern;
use crate::ports::IndicatorOut;

/// An [`IndicatorOut`] over any embedded-hal output pin.
pub struct PinIndicator<P, D> {
    pin: P,
    delay: D,
    /// Invert for active-low wiring.
    active_low: bool,
}

impl<P: OutputPin, D: DelayNs> PinIndicator<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            pin,
            delay,
            active_low: false,
        }
    }

    pub fn active_low(mut self) -> Self {
        self.active_low = true;
        self
    }

    fn set(&mut self, on: bool) {
        let high = on != self.active_low;
        let r = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if r.is_err() {
            log::warn!("INDICATOR | pin write failed");
        }
    }
}

impl<P: OutputPin + Send, D: DelayNs + Send> IndicatorOut for PinIndicator<P, D> {
    fn turn_on(&mut self) {
        self.set(true);
    }

    fn turn_off(&mut self) {
        self.set(false);
    }

    fn blink(&mut self, pattern: BlinkPattern) {
        for i in 0..pattern.quantity {
            self.set(true);
            self.delay.delay_ms(u32::from(pattern.on_ms));
            self.set(false);
            if i + 1 < pattern.quantity && pattern.off_ms > 0 {
                self.delay.delay_ms(u32::from(pattern.off_ms));
            }
        }
    }
}
