//! Annunciator drivers — siren, flasher beacon, panel buzzer.
//!
//! Siren and flasher are latched outputs with an optional one-shot
//! auto-off timer; the buzzer is pattern-only. Each driver owns its
//! activation state and timer handle; the physical channel and the timer
//! service are borrowed per call so the engine keeps single ownership of
//! both.
//!
//! Timer expiry is delivered by the worker via `timer_expired`, never from
//! the timer-service context.

use log::{info, warn};

use crate::config::AlarmConfig;
use crate::mode::AlarmMode;
use crate::ports::{IndicatorOut, TimerHandle, TimerService};
use crate::signal::TimerEvent;

// ---------------------------------------------------------------------------
// Siren
// ---------------------------------------------------------------------------

pub struct SirenDriver {
    active: bool,
    timer: Option<TimerHandle>,
}

impl SirenDriver {
    pub fn new() -> Self {
        Self {
            active: false,
            timer: None,
        }
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// Sound the siren. Respects the quiet window; re-arms the auto-off
    /// timer on every call so a fresh alarm extends the sounding.
    pub fn alarm_on(
        &mut self,
        out: &mut dyn IndicatorOut,
        timers: &mut dyn TimerService,
        config: &AlarmConfig,
        hour: Option<u8>,
    ) {
        if let (Some(quiet), Some(h)) = (&config.siren_quiet, hour) {
            if quiet.is_quiet(h) {
                info!("SIREN | suppressed (quiet hours)");
                return;
            }
        }

        if let Some(t) = self.timer.take() {
            timers.cancel(t);
        }
        if config.siren_duration_s > 0 {
            match timers.schedule(TimerEvent::SirenOff, u32::from(config.siren_duration_s) * 1_000)
            {
                Ok(h) => self.timer = Some(h),
                // Degraded mode: siren stays on until disarmed.
                Err(e) => warn!("SIREN | auto-off timer failed: {e}"),
            }
        }

        if !self.active {
            out.turn_on();
            self.active = true;
            info!("SIREN | on");
        }
    }

    /// Silence the siren. `forced` switches the output off even when the
    /// driver believes it is already silent.
    pub fn alarm_off(
        &mut self,
        forced: bool,
        out: &mut dyn IndicatorOut,
        timers: &mut dyn TimerService,
    ) {
        if let Some(t) = self.timer.take() {
            timers.cancel(t);
        }
        if self.active || forced {
            out.turn_off();
            if self.active {
                info!("SIREN | off");
            }
            self.active = false;
        }
    }

    /// Auto-off timer fired.
    pub fn timer_expired(&mut self, out: &mut dyn IndicatorOut) {
        self.timer = None;
        if self.active {
            out.turn_off();
            self.active = false;
            info!("SIREN | auto-off");
        }
    }

    /// Short confirmation chirp on a locally commanded mode change.
    pub fn mode_refresh(&mut self, out: &mut dyn IndicatorOut, config: &AlarmConfig) {
        if !self.active {
            out.blink(config.siren_chirp);
        }
    }
}

// ---------------------------------------------------------------------------
// Flasher beacon
// ---------------------------------------------------------------------------

pub struct FlasherDriver {
    active: bool,
    timer: Option<TimerHandle>,
}

impl FlasherDriver {
    pub fn new() -> Self {
        Self {
            active: false,
            timer: None,
        }
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn alarm_on(
        &mut self,
        out: &mut dyn IndicatorOut,
        timers: &mut dyn TimerService,
        config: &AlarmConfig,
    ) {
        if let Some(t) = self.timer.take() {
            timers.cancel(t);
        }
        if config.flasher_duration_s > 0 {
            match timers.schedule(
                TimerEvent::FlasherOff,
                u32::from(config.flasher_duration_s) * 1_000,
            ) {
                Ok(h) => self.timer = Some(h),
                Err(e) => warn!("FLASHER | auto-off timer failed: {e}"),
            }
        }

        if !self.active {
            out.turn_on();
            self.active = true;
            info!("FLASHER | on");
        }
    }

    pub fn alarm_off(
        &mut self,
        forced: bool,
        out: &mut dyn IndicatorOut,
        timers: &mut dyn TimerService,
    ) {
        if let Some(t) = self.timer.take() {
            timers.cancel(t);
        }
        if self.active || forced {
            out.turn_off();
            if self.active {
                info!("FLASHER | off");
            }
            self.active = false;
        }
    }

    pub fn timer_expired(&mut self, out: &mut dyn IndicatorOut) {
        self.timer = None;
        if self.active {
            out.turn_off();
            self.active = false;
            info!("FLASHER | auto-off");
        }
    }

    /// Mode indication blink; skipped while the beacon is alarming.
    pub fn mode_refresh(
        &mut self,
        out: &mut dyn IndicatorOut,
        config: &AlarmConfig,
        mode: AlarmMode,
        pending: bool,
    ) {
        if !self.active {
            out.blink(config.indication.pattern(mode, pending));
        }
    }
}

// ---------------------------------------------------------------------------
// Panel buzzer
// ---------------------------------------------------------------------------

pub struct BuzzerDriver {
    enabled: bool,
}

impl BuzzerDriver {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Runtime master switch.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn alarm_on(&mut self, out: &mut dyn IndicatorOut, config: &AlarmConfig) {
        if self.enabled {
            out.blink(config.buzzer_alarm);
        }
    }

    pub fn alarm_off(&mut self, out: &mut dyn IndicatorOut) {
        out.turn_off();
    }

    /// One feedback pattern per mode change.
    pub fn mode_refresh(&mut self, out: &mut dyn IndicatorOut, config: &AlarmConfig, mode: AlarmMode) {
        if !self.enabled {
            return;
        }
        let pattern = match mode {
            AlarmMode::Disabled => config.buzzer_disabled,
            AlarmMode::Armed => config.buzzer_armed,
            AlarmMode::Perimeter | AlarmMode::Outbuildings => config.buzzer_partial,
        };
        out.blink(pattern);
    }
}
