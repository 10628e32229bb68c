//! Signal and worker-queue message types.
//!
//! Raw records are produced by the GPIO/radio/bus front ends and consumed
//! by the single worker task:
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GPIO edge   │────▶│              │     │              │
//! │ RF receiver │────▶│ Signal Queue │────▶│ Alarm Worker │
//! │ Bus/virtual │────▶│  (bounded)   │     │  (consumer)  │
//! │ Timer fires │────▶│              │     │              │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Timer callbacks never touch engine state directly — they post a
//! synthetic [`Message::Timer`] into the same queue, preserving the
//! single-writer invariant.

use crate::mode::{AlarmMode, ControlSource};
use crate::registry::SensorId;

/// Bounded depth of the ingestion queue. Producers never block; a full
/// queue drops the record with an error log.
pub const SIGNAL_QUEUE_DEPTH: usize = 32;

/// Sentinel for an unused set/clear value in an event slot — never matches.
pub const VALUE_NONE: u32 = 0xFFFF_FFFF;

/// Values at or below this are treated as plain levels/sentinels; only
/// larger values are "real" codes worth an unidentified-signal report.
pub const UNIDENTIFIED_REPORT_FLOOR: u32 = 0xFF;

// ---------------------------------------------------------------------------
// Raw and qualified signals
// ---------------------------------------------------------------------------

/// Physical origin of a raw signal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Wired contact on a GPIO input (edge already qualified by the driver).
    Wired,
    /// 433 MHz receiver code.
    Rx433,
    /// Bus-delivered / virtual event.
    Bus,
}

/// One decoded record from a signal front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignal {
    pub source: SignalSource,
    /// GPIO number for wired contacts, virtual id for bus events,
    /// unused (0) for RF where the code carries the address.
    pub address: u32,
    /// Received code or logic level.
    pub value: u32,
    /// Repeats already collapsed by the receiver (0 counts as 1).
    pub repeats: u16,
}

/// A debounced, repeat-counted signal ready for matching. Ephemeral —
/// created per burst, discarded after matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifiedSignal {
    pub source: SignalSource,
    pub address: u32,
    pub value: u32,
    /// Total raw records accumulated in the burst so far.
    pub repeats: u16,
    /// True when the burst ended (idle flush); false for the early
    /// threshold dispatch of an RF burst still in progress.
    pub end_of_packet: bool,
}

// ---------------------------------------------------------------------------
// Worker messages
// ---------------------------------------------------------------------------

/// One-shot timer identities. A fire is delivered to the worker as
/// [`Message::Timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Siren auto-off delay elapsed.
    SirenOff,
    /// Flasher auto-off delay elapsed.
    FlasherOff,
    /// Alarm-confirmation window elapsed.
    ConfirmExpire,
    /// Per-event auto-clear delay elapsed — synthesize a clear transition.
    AutoClear { sensor: SensorId, slot: u8 },
}

/// Work items drained by the alarm worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// A raw signal record from a front end or `post_external_signal`.
    Signal(RawSignal),
    /// A one-shot timer fired.
    Timer(TimerEvent),
    /// Mode change request from a control channel.
    SetMode {
        mode: AlarmMode,
        source: ControlSource,
    },
    /// Republish the status snapshot (e.g. on broker reconnect).
    PublishStatus,
    /// Stop consuming signals; deregister external sources.
    Suspend,
    /// Resume after [`Message::Suspend`].
    Resume,
    /// Terminate the worker; cancel all pending timers.
    Shutdown,
}
