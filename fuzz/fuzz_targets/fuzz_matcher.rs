//! Fuzz target: `find_match`
//!
//! Throws arbitrary qualified signals at a representative registry
//! (wired, generic RF, addressed RF, bus) and verifies the matcher never
//! panics and never returns a slot index outside the sensor's array.
//!
//! cargo fuzz run fuzz_matcher

#![no_main]

use libfuzzer_sys::fuzz_target;

use homeguard::matcher::{find_match, MatchOutcome};
use homeguard::registry::{
    EventKind, EventSpec, Registry, SensorKind, MAX_EVENTS_PER_SENSOR,
};
use homeguard::signal::{QualifiedSignal, SignalSource, VALUE_NONE};

fn build_registry() -> Registry {
    let mut r = Registry::new();
    let zone = r.add_zone("zone", "zone", None).unwrap();
    let spec = |kind, value_set, value_clear, threshold| EventSpec {
        kind,
        value_set,
        message_set: "",
        value_clear,
        message_clear: "",
        threshold,
        clear_timeout_ms: 0,
        publish_interval_s: 0,
        confirm: false,
    };

    let wired = r.add_sensor(SensorKind::Wired, "door", "door", 5).unwrap();
    r.set_event(wired, zone, 0, spec(EventKind::Alarm, 1, 0, 1))
        .unwrap();

    let generic = r
        .add_sensor(SensorKind::RfGeneric, "pir", "pir", 0xA1B2C3)
        .unwrap();
    r.set_event(
        generic,
        zone,
        0,
        spec(EventKind::Alarm, VALUE_NONE, VALUE_NONE, 2),
    )
    .unwrap();

    let addressed = r
        .add_sensor(SensorKind::RfAddressed, "fob", "fob", 0xABCDE)
        .unwrap();
    r.set_event(addressed, zone, 0, spec(EventKind::CtrlArm, 0x2, VALUE_NONE, 2))
        .unwrap();
    r.set_event(addressed, zone, 1, spec(EventKind::CtrlDisable, 0x1, VALUE_NONE, 2))
        .unwrap();

    let bus = r.add_sensor(SensorKind::Bus, "virtual", "virt", 9).unwrap();
    r.set_event(bus, zone, 0, spec(EventKind::Tamper, 1, 0, 1)).unwrap();

    r
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let registry = build_registry();

    for chunk in data.chunks(8) {
        if chunk.len() < 8 {
            break;
        }
        let signal = QualifiedSignal {
            source: match chunk[0] % 3 {
                0 => SignalSource::Wired,
                1 => SignalSource::Rx433,
                _ => SignalSource::Bus,
            },
            address: u32::from_le_bytes([chunk[1], chunk[2], 0, 0]),
            value: u32::from_le_bytes([chunk[3], chunk[4], chunk[5], 0]),
            repeats: u16::from(chunk[6]),
            end_of_packet: chunk[7] & 1 == 1,
        };

        match find_match(&registry, &signal) {
            MatchOutcome::Matched { sensor, slot, .. }
            | MatchOutcome::Deferred { sensor, slot } => {
                assert!(registry.sensor(sensor).is_some());
                assert!((slot as usize) < MAX_EVENTS_PER_SENSOR);
            }
            MatchOutcome::UnknownCommand { sensor } => {
                assert!(registry.sensor(sensor).is_some());
            }
            MatchOutcome::UnknownSensor | MatchOutcome::Ignored => {}
        }
    }
});
