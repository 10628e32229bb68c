//! Event matcher — resolves a qualified signal against the registry.
//!
//! Scans sensors for an address match (decoder-specific rule), then scans
//! the matching sensor's event slots in priority order for a set or clear
//! value match. The first value match wins. A match below the slot's
//! repeat threshold is deferred — the worker re-arms the debouncer and the
//! match is retried on the next repetition.
//!
//! Edge suppression: wired contacts are level-based, so a set while
//! already set (or clear while cleared) is dropped; RF and bus sensors
//! re-deliver their set periodically and every delivery is actionable
//! (it re-arms the auto-clear timer).

use log::warn;

use crate::decoder::decoder_for;
use crate::registry::{EventKind, Registry, SensorId, SensorKind};
use crate::signal::{QualifiedSignal, UNIDENTIFIED_REPORT_FLOOR};

/// Result of matching one qualified signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A configured event slot matched and is actionable.
    Matched {
        sensor: SensorId,
        slot: u8,
        is_set: bool,
    },
    /// A slot matched but its repeat threshold is not met yet; the caller
    /// retries on the next repetition of the burst.
    Deferred { sensor: SensorId, slot: u8 },
    /// A sensor matched the address but no slot matched a "real" code —
    /// report to the notification sink for diagnosis.
    UnknownCommand { sensor: SensorId },
    /// No sensor matched a "real" code.
    UnknownSensor,
    /// Nothing to do (edge-suppressed duplicate, or sub-sentinel noise).
    Ignored,
}

/// Match `signal` against the configured sensors.
pub fn find_match(registry: &Registry, signal: &QualifiedSignal) -> MatchOutcome {
    let mut address_hit: Option<SensorId> = None;

    for (id, sensor) in registry.sensors() {
        let decoder = decoder_for(sensor.kind);
        if !decoder.matches_address(signal, sensor.address) {
            continue;
        }
        address_hit = Some(id);

        for (idx, slot) in sensor.events.iter().enumerate() {
            if slot.kind == EventKind::Empty {
                continue;
            }
            let is_set = if decoder.matches_set(signal, slot) {
                true
            } else if decoder.matches_clear(signal, slot) {
                false
            } else {
                continue;
            };

            // First value match wins; decide its fate here.
            if signal.repeats < slot.threshold {
                return MatchOutcome::Deferred {
                    sensor: id,
                    slot: idx as u8,
                };
            }
            if sensor.kind == SensorKind::Wired && slot.state == is_set {
                // Level repeat on a wired contact — not an edge.
                return MatchOutcome::Ignored;
            }
            return MatchOutcome::Matched {
                sensor: id,
                slot: idx as u8,
                is_set,
            };
        }
    }

    if signal.value <= UNIDENTIFIED_REPORT_FLOOR {
        return MatchOutcome::Ignored;
    }
    match address_hit {
        Some(sensor) => {
            warn!(
                "MATCH | no command for value 0x{:08X} on sensor #{}",
                signal.value, sensor.0
            );
            MatchOutcome::UnknownCommand { sensor }
        }
        None => {
            warn!(
                "MATCH | unidentified signal {:?} value 0x{:08X}",
                signal.source, signal.value
            );
            MatchOutcome::UnknownSensor
        }
    }
}
