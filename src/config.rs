//! System configuration parameters
//!
//! All tunable parameters for the HomeGuard panel.
//! Values can be overridden via NVS (non-volatile storage) or a bus command.

use serde::{Deserialize, Serialize};

/// A blink/flash request: `quantity` pulses of `on_ms`, spaced `off_ms` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkPattern {
    pub quantity: u8,
    pub on_ms: u16,
    pub off_ms: u16,
}

impl BlinkPattern {
    pub const fn new(quantity: u8, on_ms: u16, off_ms: u16) -> Self {
        Self {
            quantity,
            on_ms,
            off_ms,
        }
    }
}

/// Time-of-day window during which the siren stays silent.
/// Wraps around midnight when `start_hour > end_hour`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuietHours {
    /// Start hour (0-23 inclusive).  E.g. 23 = 11 PM.
    pub start_hour: u8,
    /// End hour (0-23 inclusive).  E.g. 7 = 7 AM.
    pub end_hour: u8,
}

impl QuietHours {
    /// Check if the given hour is within quiet hours.
    pub fn is_quiet(&self, hour: u8) -> bool {
        if self.start_hour <= self.end_hour {
            // e.g., 9..17 (daytime quiet)
            hour >= self.start_hour && hour < self.end_hour
        } else {
            // e.g., 23..7 (overnight quiet — wraps around midnight)
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Mode/alarm indication patterns for the flasher and the mode LED.
///
/// One pattern per arming mode × pending-alarms combination; `partial`
/// covers both perimeter and outbuildings arming.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModeIndication {
    pub disabled: BlinkPattern,
    pub disabled_pending: BlinkPattern,
    pub armed: BlinkPattern,
    pub armed_pending: BlinkPattern,
    pub partial: BlinkPattern,
}

impl ModeIndication {
    /// Select the pattern for `mode` given whether alarms are pending.
    pub fn pattern(&self, mode: crate::mode::AlarmMode, pending: bool) -> BlinkPattern {
        use crate::mode::AlarmMode;
        match (mode, pending) {
            (AlarmMode::Disabled, false) => self.disabled,
            (AlarmMode::Disabled, true) => self.disabled_pending,
            (AlarmMode::Armed, false) => self.armed,
            (AlarmMode::Armed, true) => self.armed_pending,
            (AlarmMode::Perimeter | AlarmMode::Outbuildings, _) => self.partial,
        }
    }
}

/// Core panel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    // --- Signal qualification ---
    /// RF repeats required before a burst is dispatched early
    pub rf_repeat_threshold: u16,
    /// Idle gap (milliseconds) that ends an RF burst
    pub rf_idle_timeout_ms: u32,

    // --- Siren ---
    /// Siren auto-off delay in seconds (0 = sound until disarmed)
    pub siren_duration_s: u16,
    /// Time-of-day window during which the siren never sounds
    pub siren_quiet: Option<QuietHours>,
    /// Short confirmation chirp on locally commanded mode changes
    pub siren_chirp: BlinkPattern,

    // --- Flasher ---
    /// Flasher auto-off delay in seconds (0 = flash until disarmed)
    pub flasher_duration_s: u16,

    // --- Buzzer ---
    /// Panel buzzer master switch
    pub buzzer_enabled: bool,
    /// Buzzer pattern on an alarm response
    pub buzzer_alarm: BlinkPattern,
    /// Buzzer pattern when disarming
    pub buzzer_disabled: BlinkPattern,
    /// Buzzer pattern when fully arming
    pub buzzer_armed: BlinkPattern,
    /// Buzzer pattern when arming perimeter/outbuildings
    pub buzzer_partial: BlinkPattern,

    // --- Alarm confirmation ---
    /// Window (milliseconds) within which a second confirmation-required
    /// trigger validates an alarm
    pub confirm_window_ms: u32,

    // --- Indication ---
    /// Mode LED / flasher indication patterns
    pub indication: ModeIndication,
    /// RF activity LED flash on every incoming signal
    pub rf_activity: BlinkPattern,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            // Signal qualification
            rf_repeat_threshold: 2,
            rf_idle_timeout_ms: 450,

            // Siren
            siren_duration_s: 180,
            siren_quiet: None,
            siren_chirp: BlinkPattern::new(1, 100, 0),

            // Flasher
            flasher_duration_s: 300,

            // Buzzer
            buzzer_enabled: true,
            buzzer_alarm: BlinkPattern::new(3, 300, 200),
            buzzer_disabled: BlinkPattern::new(1, 150, 0),
            buzzer_armed: BlinkPattern::new(2, 150, 150),
            buzzer_partial: BlinkPattern::new(3, 100, 100),

            // Confirmation
            confirm_window_ms: 30_000,

            // Indication
            indication: ModeIndication {
                disabled: BlinkPattern::new(1, 100, 5_000),
                disabled_pending: BlinkPattern::new(2, 100, 1_000),
                armed: BlinkPattern::new(1, 250, 2_500),
                armed_pending: BlinkPattern::new(2, 250, 500),
                partial: BlinkPattern::new(1, 250, 5_000),
            },
            rf_activity: BlinkPattern::new(1, 50, 0),
        }
    }
}

impl AlarmConfig {
    /// Range-check every field. Out-of-range values are rejected here, not
    /// clamped, so a compromised provisioning channel cannot inject
    /// dangerous operating parameters.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.rf_repeat_threshold == 0 {
            return Err("rf_repeat_threshold must be >= 1");
        }
        if self.rf_idle_timeout_ms < 50 || self.rf_idle_timeout_ms > 10_000 {
            return Err("rf_idle_timeout_ms out of range (50..=10000)");
        }
        if self.confirm_window_ms < 1_000 || self.confirm_window_ms > 600_000 {
            return Err("confirm_window_ms out of range (1s..=10min)");
        }
        if let Some(q) = &self.siren_quiet {
            if q.start_hour > 23 || q.end_hour > 23 {
                return Err("siren_quiet hours must be 0..=23");
            }
        }
        Ok(())
    }
}
