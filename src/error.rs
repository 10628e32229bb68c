//! Unified error types for the HomeGuard firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the top-level worker's error handling uniform.
//! All variants are `Copy` so they can be cheaply passed through the engine
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Zone/sensor registration or lookup failed.
    Registry(RegistryError),
    /// The ingestion queue rejected a record.
    Queue(QueueError),
    /// A one-shot timer could not be created or started.
    Timer(TimerError),
    /// The persistence backend failed.
    Store(StoreError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Queue(e) => write!(f, "queue: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The zone arena is at capacity.
    ZoneLimit,
    /// The sensor arena is at capacity.
    SensorLimit,
    /// Event slot index is outside the per-sensor slot array.
    SlotIndex,
    /// A zone handle does not refer to a registered zone.
    UnknownZone,
    /// A sensor handle does not refer to a registered sensor.
    UnknownSensor,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZoneLimit => write!(f, "zone limit reached"),
            Self::SensorLimit => write!(f, "sensor limit reached"),
            Self::SlotIndex => write!(f, "event slot index out of range"),
            Self::UnknownZone => write!(f, "unknown zone handle"),
            Self::UnknownSensor => write!(f, "unknown sensor handle"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Queue errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The bounded ingestion queue is full — the record was dropped.
    Full,
    /// The worker has shut down; no consumer remains.
    Closed,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "ingestion queue full"),
            Self::Closed => write!(f, "worker queue closed"),
        }
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

/// Timer failures degrade gracefully: an annunciator whose auto-off timer
/// failed to start simply never self-silences. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    CreateFailed,
    StartFailed,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateFailed => write!(f, "timer create failed"),
            Self::StartFailed => write!(f, "timer start failed"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No stored value exists (first boot).
    NotFound,
    /// Stored value failed integrity / deserialization check.
    Corrupted,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "value not found"),
            Self::Corrupted => write!(f, "stored value corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// std::error::Error impls (for `?` into anyhow at the binary layer)
// ---------------------------------------------------------------------------

impl core::error::Error for Error {}
impl core::error::Error for RegistryError {}
impl core::error::Error for QueueError {}
impl core::error::Error for TimerError {}
impl core::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
