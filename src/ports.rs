//! Port traits — the boundary between the alarm core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AlarmEngine (domain)
//! ```
//!
//! Driven adapters (annunciator outputs, notification/status sinks, timer
//! service, persistence) implement these traits. The engine owns them as
//! boxed trait objects injected at construction, so the core never touches
//! hardware directly and every test runs against mocks.

use crate::config::BlinkPattern;
use crate::error::{StoreError, TimerError};
use crate::mode::{AlarmMode, ControlSource};
use crate::signal::TimerEvent;
use crate::status::{SignalEventRecord, StatusSnapshot};

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic + wall-clock time source.
pub trait Clock {
    /// Milliseconds since boot (monotonic).
    fn monotonic_ms(&self) -> u64;

    /// Seconds since the Unix epoch (wall clock; may jump after NTP sync).
    fn epoch_secs(&self) -> i64;

    /// Current hour-of-day (0–23). `None` when the wall clock is not
    /// synced — the siren quiet window is skipped in that case.
    fn hour_of_day(&self) -> Option<u8>;
}

// ───────────────────────────────────────────────────────────────
// One-shot timers
// ───────────────────────────────────────────────────────────────

/// Opaque handle for a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(pub u32);

/// Schedules one-shot alarms on the platform timer service.
///
/// Expiry MUST NOT mutate engine state from the timer context: the
/// implementation posts [`TimerEvent`] back into the worker queue
/// (see [`bind`](TimerService::bind)), preserving single-writer access.
pub trait TimerService {
    /// Attach the worker queue that expiries are posted into. Called once
    /// by the service before the worker starts.
    fn bind(&mut self, _queue: crate::worker::SignalHandle) {}

    /// Schedule `event` to fire once after `after_ms`.
    fn schedule(&mut self, event: TimerEvent, after_ms: u32) -> Result<TimerHandle, TimerError>;

    /// Cancel a pending timer. Canceling an already-fired or unknown
    /// handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

// ───────────────────────────────────────────────────────────────
// Annunciator outputs
// ───────────────────────────────────────────────────────────────

/// One physical annunciator channel (siren relay, flasher beacon, panel
/// buzzer, indicator LED). Implementations must be cheap — they are called
/// from the worker's dispatch path.
pub trait IndicatorOut {
    fn turn_on(&mut self);
    fn turn_off(&mut self);
    /// Emit a finite blink pattern; steady state afterwards is off.
    fn blink(&mut self, pattern: BlinkPattern);
}

/// The full set of annunciator channels wired at startup.
pub struct AlarmIndicators {
    pub siren: Box<dyn IndicatorOut + Send>,
    pub flasher: Box<dyn IndicatorOut + Send>,
    pub buzzer: Box<dyn IndicatorOut + Send>,
    /// Mode indication LED on the panel.
    pub mode_led: Box<dyn IndicatorOut + Send>,
    /// Flashes on every incoming signal (can share a LED with `mode_led`).
    pub rf_led: Box<dyn IndicatorOut + Send>,
}

// ───────────────────────────────────────────────────────────────
// Notification / status sinks
// ───────────────────────────────────────────────────────────────

/// Urgency class of an outbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    /// Confirmed alarm — highest urgency.
    Alarm,
    /// Faults, tampers, unidentified signals.
    Warning,
    /// Mode changes and housekeeping.
    Info,
}

/// Fire-and-forget formatted human alerts (messenger, SMS gateway, …).
pub trait NotificationSink {
    fn send(&mut self, kind: NotifyKind, message: &str);
}

/// Structured status/event publication (wire format out of scope).
/// `publish_status` is idempotent and may be called redundantly.
pub trait StatusSink {
    fn publish_status(&mut self, snapshot: &StatusSnapshot);
    fn publish_event(&mut self, event: &SignalEventRecord);
}

// ───────────────────────────────────────────────────────────────
// Persistence
// ───────────────────────────────────────────────────────────────

/// Persists the arming mode across reboots.
pub trait ModeStore {
    fn store(&mut self, mode: AlarmMode) -> Result<(), StoreError>;
    /// `None` on first boot or corrupted storage.
    fn load(&self) -> Option<AlarmMode>;
}

// ───────────────────────────────────────────────────────────────
// Signal front ends
// ───────────────────────────────────────────────────────────────

/// Synchronous GPIO level query, used to reconcile the wired-contact level
/// at end of transmission.
pub trait LevelReader {
    /// Current logic level of `gpio`, or `None` if the pin is unreadable.
    fn read_level(&mut self, gpio: u32) -> Option<u32>;
}

/// External event-source subscriptions (GPIO ISRs, RF receiver, bus
/// topics). The worker deregisters them on suspend and re-registers on
/// resume so no records arrive while the core is paused.
pub trait SignalSources {
    fn suspend(&mut self);
    fn resume(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Host callbacks
// ───────────────────────────────────────────────────────────────

/// Per-zone relay control. Receives the demanded state, returns the state
/// actually applied by the hardware.
pub type RelayControl = Box<dyn FnMut(bool) -> bool + Send>;

/// Invoked after every applied mode transition.
pub type ModeChangeHook = Box<dyn FnMut(AlarmMode, ControlSource) + Send>;

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Everything the engine needs injected at construction.
pub struct AlarmPorts {
    pub indicators: AlarmIndicators,
    pub timers: Box<dyn TimerService + Send>,
    pub clock: Box<dyn Clock + Send>,
    pub notifier: Box<dyn NotificationSink + Send>,
    pub status: Box<dyn StatusSink + Send>,
    pub store: Box<dyn ModeStore + Send>,
    /// GPIO level reconciliation; `None` skips it (RF/bus-only systems).
    pub levels: Option<Box<dyn LevelReader + Send>>,
    /// Suspend/resume hooks for the signal front ends.
    pub sources: Option<Box<dyn SignalSources + Send>>,
    pub on_mode_change: Option<ModeChangeHook>,
}

/// A no-op indicator for unused annunciator channels.
pub struct NullIndicator;

impl IndicatorOut for NullIndicator {
    fn turn_on(&mut self) {}
    fn turn_off(&mut self) {}
    fn blink(&mut self, _pattern: BlinkPattern) {}
}

// ───────────────────────────────────────────────────────────────
// Unit-test support
// ───────────────────────────────────────────────────────────────
