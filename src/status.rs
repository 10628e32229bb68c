//! Status projection — immutable snapshots for publication.
//!
//! A pure rendering of the current global state + zone list; no state of
//! its own. The external publishing sink serializes the snapshot however
//! it likes (the wire format is out of scope here — everything derives
//! `Serialize`).

use serde::Serialize;

use crate::mode::AlarmMode;
use crate::registry::{EventKind, Registry, SensorId};

/// Annunciator summary bits.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnnunciatorStatus {
    pub siren: bool,
    pub flasher: bool,
    /// Count of active annunciators — display scripts blink on `> 0`.
    pub summary: u8,
}

/// Sensor + wall-clock reference for the last event / last alarm.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EventStamp {
    pub sensor: &'static str,
    pub at: i64,
}

/// Per-zone line of the snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ZoneStatus {
    pub name: &'static str,
    pub topic: &'static str,
    /// Active-event count; never negative.
    pub status: u16,
    pub last_set: i64,
    pub last_clear: i64,
    pub relay: bool,
}

/// Immutable status snapshot of the whole panel.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub mode: AlarmMode,
    pub mode_label: &'static str,
    /// Composite one-word status for displays.
    pub status: &'static str,
    /// Alarms registered since the last arming.
    pub alarms: u16,
    pub annunciator: AnnunciatorStatus,
    pub last_alarm: Option<EventStamp>,
    pub last_event: Option<EventStamp>,
    pub zones: Vec<ZoneStatus>,
}

/// One published event transition.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SignalEventRecord {
    pub sensor: &'static str,
    pub sensor_topic: &'static str,
    pub zone: &'static str,
    pub zone_topic: &'static str,
    pub kind: EventKind,
    pub is_set: bool,
    pub value: u32,
    pub message: &'static str,
    pub at: i64,
}

/// Build a snapshot from the live state.
#[allow(clippy::too_many_arguments)]
pub fn project(
    registry: &Registry,
    mode: AlarmMode,
    alarms: u16,
    last_alarm: Option<(SensorId, i64)>,
    last_event: Option<(SensorId, i64)>,
    siren: bool,
    flasher: bool,
) -> StatusSnapshot {
    let summary = u8::from(siren) + u8::from(flasher);
    let stamp = |entry: Option<(SensorId, i64)>| {
        entry.and_then(|(id, at)| {
            registry.sensor(id).map(|s| EventStamp {
                sensor: s.name,
                at,
            })
        })
    };

    StatusSnapshot {
        mode,
        mode_label: mode.label(),
        status: status_label(mode, alarms, summary),
        alarms,
        annunciator: AnnunciatorStatus {
            siren,
            flasher,
            summary,
        },
        last_alarm: stamp(last_alarm),
        last_event: stamp(last_event),
        zones: registry
            .zones()
            .map(|(_, z)| ZoneStatus {
                name: z.name,
                topic: z.topic,
                status: z.status,
                last_set: z.last_set,
                last_clear: z.last_clear,
                relay: z.relay_state,
            })
            .collect(),
    }
}

/// Composite display label.
fn status_label(mode: AlarmMode, alarms: u16, annunciator_summary: u8) -> &'static str {
    if annunciator_summary > 0 {
        "alarm"
    } else if alarms > 0 && mode.is_armed() {
        "alarms pending"
    } else if mode.is_armed() {
        "guarded"
    } else {
        "standby"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SensorKind;

    fn fixture() -> (Registry, SensorId) {
        let mut r = Registry::new();
        let z = r.add_zone("hall", "hall", None).unwrap();
        let s = r.add_sensor(SensorKind::Wired, "door", "door", 5).unwrap();
        r.zone_mut(z).unwrap().status = 2;
        r.zone_mut(z).unwrap().last_set = 1_700_000_100;
        (r, s)
    }

    #[test]
    fn snapshot_reflects_zone_state() {
        let (r, _) = fixture();
        let snap = project(&r, AlarmMode::Armed, 0, None, None, false, false);
        assert_eq!(snap.zones.len(), 1);
        assert_eq!(snap.zones[0].name, "hall");
        assert_eq!(snap.zones[0].status, 2);
        assert_eq!(snap.zones[0].last_set, 1_700_000_100);
        assert_eq!(snap.status, "guarded");
    }

    #[test]
    fn labels_by_mode_and_alarms() {
        let (r, _) = fixture();
        let snap = project(&r, AlarmMode::Disabled, 0, None, None, false, false);
        assert_eq!(snap.status, "standby");

        let snap = project(&r, AlarmMode::Perimeter, 3, None, None, false, false);
        assert_eq!(snap.status, "alarms pending");

        let snap = project(&r, AlarmMode::Armed, 3, None, None, true, true);
        assert_eq!(snap.status, "alarm");
        assert_eq!(snap.annunciator.summary, 2);
    }

    #[test]
    fn last_alarm_resolves_sensor_name() {
        let (r, s) = fixture();
        let snap = project(
            &r,
            AlarmMode::Armed,
            1,
            Some((s, 1_700_000_200)),
            Some((s, 1_700_000_200)),
            false,
            false,
        );
        let la = snap.last_alarm.unwrap();
        assert_eq!(la.sensor, "door");
        assert_eq!(la.at, 1_700_000_200);
    }

    #[test]
    fn snapshot_serializes() {
        let (r, s) = fixture();
        let snap = project(
            &r,
            AlarmMode::Armed,
            1,
            Some((s, 1)),
            Some((s, 1)),
            true,
            false,
        );
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"mode_label\":\"armed\""));
        assert!(json.contains("\"hall\""));
    }
}
