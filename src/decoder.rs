//! Per-sensor-type signal decoders.
//!
//! Address and value matching differ per sensor technology, so each
//! [`SensorKind`] maps to a decoder implementing the three checks the
//! matcher needs. All decoders are stateless unit structs behind a
//! `&'static dyn` — no allocation, no per-call dispatch setup.
//!
//! | Kind         | Address rule                  | Set / clear rule            |
//! |--------------|-------------------------------|-----------------------------|
//! | Wired        | GPIO number equality          | exact level compare         |
//! | RF generic   | whole code == sensor address  | set always, clear never     |
//! | RF addressed | code >> 4 == sensor address   | low 4 bits == slot value    |
//! | Bus          | virtual id equality           | exact value compare         |

use crate::registry::{EventSlot, SensorKind};
use crate::signal::{QualifiedSignal, SignalSource, VALUE_NONE};

/// Type-specific address/value matching for one sensor technology.
pub trait SignalDecoder {
    fn matches_address(&self, signal: &QualifiedSignal, sensor_address: u32) -> bool;
    fn matches_set(&self, signal: &QualifiedSignal, slot: &EventSlot) -> bool;
    fn matches_clear(&self, signal: &QualifiedSignal, slot: &EventSlot) -> bool;
}

/// Look up the decoder for a sensor kind.
pub fn decoder_for(kind: SensorKind) -> &'static dyn SignalDecoder {
    match kind {
        SensorKind::Wired => &WiredDecoder,
        SensorKind::RfGeneric => &GenericRfDecoder,
        SensorKind::RfAddressed => &AddressedRfDecoder,
        SensorKind::Bus => &BusDecoder,
    }
}

// ---------------------------------------------------------------------------
// Wired contacts
// ---------------------------------------------------------------------------

struct WiredDecoder;

impl SignalDecoder for WiredDecoder {
    fn matches_address(&self, signal: &QualifiedSignal, sensor_address: u32) -> bool {
        signal.source == SignalSource::Wired && signal.address == sensor_address
    }

    fn matches_set(&self, signal: &QualifiedSignal, slot: &EventSlot) -> bool {
        slot.value_set != VALUE_NONE && signal.value == slot.value_set
    }

    fn matches_clear(&self, signal: &QualifiedSignal, slot: &EventSlot) -> bool {
        slot.value_clear != VALUE_NONE && signal.value == slot.value_clear
    }
}

// ---------------------------------------------------------------------------
// Generic RF — the whole received code IS the sensor identity
// ---------------------------------------------------------------------------

struct GenericRfDecoder;

impl SignalDecoder for GenericRfDecoder {
    fn matches_address(&self, signal: &QualifiedSignal, sensor_address: u32) -> bool {
        signal.source == SignalSource::Rx433 && signal.value == sensor_address
    }

    // A generic sensor only ever transmits its one code: any reception is
    // a set; clears come from the auto-clear timer, never the air.
    fn matches_set(&self, _signal: &QualifiedSignal, _slot: &EventSlot) -> bool {
        true
    }

    fn matches_clear(&self, _signal: &QualifiedSignal, _slot: &EventSlot) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Addressed RF — 24-bit code: 20-bit address, 4-bit command
// ---------------------------------------------------------------------------

struct AddressedRfDecoder;

impl SignalDecoder for AddressedRfDecoder {
    fn matches_address(&self, signal: &QualifiedSignal, sensor_address: u32) -> bool {
        signal.source == SignalSource::Rx433 && (signal.value >> 4) == sensor_address
    }

    fn matches_set(&self, signal: &QualifiedSignal, slot: &EventSlot) -> bool {
        slot.value_set != VALUE_NONE && (signal.value & 0x0F) == slot.value_set
    }

    fn matches_clear(&self, signal: &QualifiedSignal, slot: &EventSlot) -> bool {
        slot.value_clear != VALUE_NONE && (signal.value & 0x0F) == slot.value_clear
    }
}

// ---------------------------------------------------------------------------
// Bus / virtual
// ---------------------------------------------------------------------------

struct BusDecoder;

impl SignalDecoder for BusDecoder {
    fn matches_address(&self, signal: &QualifiedSignal, sensor_address: u32) -> bool {
        signal.source == SignalSource::Bus && signal.address == sensor_address
    }

    fn matches_set(&self, signal: &QualifiedSignal, slot: &EventSlot) -> bool {
        slot.value_set != VALUE_NONE && signal.value == slot.value_set
    }

    fn matches_clear(&self, signal: &QualifiedSignal, slot: &EventSlot) -> bool {
        slot.value_clear != VALUE_NONE && signal.value == slot.value_clear
    }
}
